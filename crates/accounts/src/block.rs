//! Block wire types.
//!
//! Only the pieces the accounts subsystem consumes: the header (for the
//! height and the accounts hash it commits to), the body (transactions,
//! miner, prune list) and the interlink, which is carried opaquely but
//! must round-trip through the codec.

use nimiq_codec::{
    read_bytes_u8, read_list_u16, write_bytes_u8, write_list_u16, Decode, Encode, Reader,
};
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::address::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub interlink: BlockInterlink,
    pub body: Option<BlockBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u16,
    pub prev_hash: [u8; 32],
    pub interlink_hash: [u8; 32],
    pub body_hash: [u8; 32],
    pub accounts_hash: [u8; 32],
    pub n_bits: u32,
    pub height: u32,
    pub timestamp: u32,
    pub nonce: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    pub miner: Address,
    pub extra_data: Vec<u8>,
    pub txs: Vec<crate::transaction::Transaction>,
    pub pruned: Vec<PrunedAccount>,
}

/// Record of an account removed from the state by this block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedAccount {
    pub address: Address,
    pub account: Account,
}

/// The NIPoPoW interlink: a list of block hashes where runs of the same
/// hash are compressed away. On the wire: the logical hash count, one
/// repeat bit per hash (set = same as the previous hash), then only the
/// distinct hashes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockInterlink {
    pub count: u8,
    pub repeat_bits: Vec<u8>,
    pub compressed: Vec<[u8; 32]>,
}

impl BlockInterlink {
    fn repeated(&self, i: u8) -> bool {
        self.repeat_bits[usize::from(i) / 8] & (0x80 >> (i % 8)) != 0
    }
}

impl Encode for BlockInterlink {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.count);
        out.extend_from_slice(&self.repeat_bits);
        for hash in &self.compressed {
            hash.encode_to(out);
        }
    }

    fn encoded_size(&self) -> usize {
        1 + self.repeat_bits.len() + self.compressed.len() * 32
    }
}

impl Decode for BlockInterlink {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        let count = r.take_u8()?;
        let repeat_bits = r.take(usize::from(count).div_ceil(8))?.to_vec();
        let interlink = BlockInterlink {
            count,
            repeat_bits,
            compressed: Vec::new(),
        };
        let distinct = (0..count).filter(|&i| !interlink.repeated(i)).count();
        let mut compressed = Vec::with_capacity(distinct);
        for _ in 0..distinct {
            compressed.push(Decode::decode_from(r)?);
        }
        Ok(BlockInterlink {
            compressed,
            ..interlink
        })
    }
}

impl Encode for BlockHeader {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.version.encode_to(out);
        self.prev_hash.encode_to(out);
        self.interlink_hash.encode_to(out);
        self.body_hash.encode_to(out);
        self.accounts_hash.encode_to(out);
        self.n_bits.encode_to(out);
        self.height.encode_to(out);
        self.timestamp.encode_to(out);
        self.nonce.encode_to(out);
    }

    fn encoded_size(&self) -> usize {
        2 + 32 * 4 + 4 * 4
    }
}

impl Decode for BlockHeader {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        Ok(BlockHeader {
            version: u16::decode_from(r)?,
            prev_hash: Decode::decode_from(r)?,
            interlink_hash: Decode::decode_from(r)?,
            body_hash: Decode::decode_from(r)?,
            accounts_hash: Decode::decode_from(r)?,
            n_bits: u32::decode_from(r)?,
            height: u32::decode_from(r)?,
            timestamp: u32::decode_from(r)?,
            nonce: u32::decode_from(r)?,
        })
    }
}

impl Encode for PrunedAccount {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.address.encode_to(out);
        self.account.encode_to(out);
    }

    fn encoded_size(&self) -> usize {
        20 + self.account.encoded_size()
    }
}

impl Decode for PrunedAccount {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        Ok(PrunedAccount {
            address: Address::decode_from(r)?,
            account: Account::decode_from(r)?,
        })
    }
}

impl Encode for BlockBody {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.miner.encode_to(out);
        write_bytes_u8(out, &self.extra_data);
        write_list_u16(out, &self.txs);
        write_list_u16(out, &self.pruned);
    }

    fn encoded_size(&self) -> usize {
        20 + 1
            + self.extra_data.len()
            + 2
            + self.txs.iter().map(Encode::encoded_size).sum::<usize>()
            + 2
            + self.pruned.iter().map(Encode::encoded_size).sum::<usize>()
    }
}

impl Decode for BlockBody {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        Ok(BlockBody {
            miner: Address::decode_from(r)?,
            extra_data: read_bytes_u8(r)?,
            txs: read_list_u16(r)?,
            pruned: read_list_u16(r)?,
        })
    }
}

impl Encode for Block {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.header.encode_to(out);
        self.interlink.encode_to(out);
        self.body.encode_to(out);
    }

    fn encoded_size(&self) -> usize {
        self.header.encoded_size() + self.interlink.encoded_size() + self.body.encoded_size()
    }
}

impl Decode for Block {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        Ok(Block {
            header: BlockHeader::decode_from(r)?,
            interlink: BlockInterlink::decode_from(r)?,
            body: Option::decode_from(r)?,
        })
    }
}
