//! On-chain transactions.
//!
//! Two wire formats exist: the compact basic transfer between two plain
//! accounts, and the extended format with explicit account types, a data
//! blob (contract creation parameters) and a proof blob (signatures,
//! preimages). Both project onto [`TxContent`], the canonical field
//! ordering that doubles as the signing preimage.

use nimiq_codec::{read_bytes_u16, write_bytes_u16, Decode, Encode, Reader};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::address::Address;
use crate::account::AccountType;

/// Transaction type tags.
pub const TX_TYPE_BASIC: u8 = 0;
pub const TX_TYPE_EXTENDED: u8 = 1;

/// Flag bit marking a contract-creation transaction.
pub const TX_FLAG_CONTRACT_CREATION: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    Basic(BasicTx),
    Extended(ExtendedTx),
}

impl Transaction {
    pub fn tx_type(&self) -> u8 {
        match self {
            Transaction::Basic(_) => TX_TYPE_BASIC,
            Transaction::Extended(_) => TX_TYPE_EXTENDED,
        }
    }

    pub fn value(&self) -> u64 {
        match self {
            Transaction::Basic(tx) => tx.value,
            Transaction::Extended(tx) => tx.value,
        }
    }

    pub fn fee(&self) -> u64 {
        match self {
            Transaction::Basic(tx) => tx.fee,
            Transaction::Extended(tx) => tx.fee,
        }
    }

    pub fn flags(&self) -> u8 {
        match self {
            Transaction::Basic(_) => 0,
            Transaction::Extended(tx) => tx.flags,
        }
    }

    pub fn is_contract_creation(&self) -> bool {
        self.flags() & TX_FLAG_CONTRACT_CREATION != 0
    }

    /// Sender address and account type. A basic transaction's sender is
    /// derived from its public key and always a basic account.
    pub fn sender(&self) -> (Address, u8) {
        match self {
            Transaction::Basic(tx) => (
                Address::from_public_key(&tx.sender_pubkey),
                AccountType::Basic as u8,
            ),
            Transaction::Extended(tx) => (tx.sender, tx.sender_type),
        }
    }

    pub fn recipient(&self) -> (Address, u8) {
        match self {
            Transaction::Basic(tx) => (tx.recipient, AccountType::Basic as u8),
            Transaction::Extended(tx) => (tx.recipient, tx.recipient_type),
        }
    }

    pub fn as_extended(&self) -> Option<&ExtendedTx> {
        match self {
            Transaction::Basic(_) => None,
            Transaction::Extended(tx) => Some(tx),
        }
    }

    /// The canonical projection used as the signing preimage.
    pub fn content(&self) -> TxContent {
        match self {
            Transaction::Basic(tx) => TxContent {
                data: Vec::new(),
                sender: Address::from_public_key(&tx.sender_pubkey),
                sender_type: AccountType::Basic as u8,
                recipient: tx.recipient,
                recipient_type: AccountType::Basic as u8,
                value: tx.value,
                fee: tx.fee,
                validity_start_height: tx.validity_start_height,
                network_id: tx.network_id,
                flags: 0,
            },
            Transaction::Extended(tx) => TxContent {
                data: tx.data.clone(),
                sender: tx.sender,
                sender_type: tx.sender_type,
                recipient: tx.recipient,
                recipient_type: tx.recipient_type,
                value: tx.value,
                fee: tx.fee,
                validity_start_height: tx.validity_start_height,
                network_id: tx.network_id,
                flags: tx.flags,
            },
        }
    }
}

impl Encode for Transaction {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.tx_type());
        match self {
            Transaction::Basic(tx) => tx.encode_to(out),
            Transaction::Extended(tx) => tx.encode_to(out),
        }
    }

    fn encoded_size(&self) -> usize {
        1 + match self {
            Transaction::Basic(tx) => tx.encoded_size(),
            Transaction::Extended(tx) => tx.encoded_size(),
        }
    }
}

impl Decode for Transaction {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        match r.take_u8()? {
            TX_TYPE_BASIC => Ok(Transaction::Basic(BasicTx::decode_from(r)?)),
            TX_TYPE_EXTENDED => Ok(Transaction::Extended(ExtendedTx::decode_from(r)?)),
            tag => Err(nimiq_codec::Error::InvalidTag { tag }),
        }
    }
}

/// Simple transfer between two basic accounts.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicTx {
    pub sender_pubkey: [u8; 32],
    pub recipient: Address,
    pub value: u64,
    pub fee: u64,
    pub validity_start_height: u32,
    pub network_id: u8,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

impl Encode for BasicTx {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.sender_pubkey.encode_to(out);
        self.recipient.encode_to(out);
        self.value.encode_to(out);
        self.fee.encode_to(out);
        self.validity_start_height.encode_to(out);
        self.network_id.encode_to(out);
        self.signature.encode_to(out);
    }

    fn encoded_size(&self) -> usize {
        32 + 20 + 8 + 8 + 4 + 1 + 64
    }
}

impl Decode for BasicTx {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        Ok(BasicTx {
            sender_pubkey: Decode::decode_from(r)?,
            recipient: Address::decode_from(r)?,
            value: u64::decode_from(r)?,
            fee: u64::decode_from(r)?,
            validity_start_height: u32::decode_from(r)?,
            network_id: u8::decode_from(r)?,
            signature: Decode::decode_from(r)?,
        })
    }
}

/// Transfer with explicit account types, creation data and proof blob.
///
/// The wire layout is the [`TxContent`] fields followed by the
/// length-tagged proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedTx {
    pub sender: Address,
    pub sender_type: u8,
    pub recipient: Address,
    pub recipient_type: u8,
    pub value: u64,
    pub fee: u64,
    pub validity_start_height: u32,
    pub flags: u8,
    pub data: Vec<u8>,
    pub proof: Vec<u8>,
    pub network_id: u8,
}

impl Encode for ExtendedTx {
    fn encode_to(&self, out: &mut Vec<u8>) {
        write_bytes_u16(out, &self.data);
        self.sender.encode_to(out);
        self.sender_type.encode_to(out);
        self.recipient.encode_to(out);
        self.recipient_type.encode_to(out);
        self.value.encode_to(out);
        self.fee.encode_to(out);
        self.validity_start_height.encode_to(out);
        self.network_id.encode_to(out);
        self.flags.encode_to(out);
        write_bytes_u16(out, &self.proof);
    }

    fn encoded_size(&self) -> usize {
        2 + self.data.len() + 20 + 1 + 20 + 1 + 8 + 8 + 4 + 1 + 1 + 2 + self.proof.len()
    }
}

impl Decode for ExtendedTx {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        let data = read_bytes_u16(r)?;
        let sender = Address::decode_from(r)?;
        let sender_type = u8::decode_from(r)?;
        let recipient = Address::decode_from(r)?;
        let recipient_type = u8::decode_from(r)?;
        let value = u64::decode_from(r)?;
        let fee = u64::decode_from(r)?;
        let validity_start_height = u32::decode_from(r)?;
        let network_id = u8::decode_from(r)?;
        let flags = u8::decode_from(r)?;
        let proof = read_bytes_u16(r)?;
        Ok(ExtendedTx {
            sender,
            sender_type,
            recipient,
            recipient_type,
            value,
            fee,
            validity_start_height,
            flags,
            data,
            proof,
            network_id,
        })
    }
}

/// Canonical transaction content: the common fields in fixed order. The
/// encoding of this struct is what gets signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContent {
    pub data: Vec<u8>,
    pub sender: Address,
    pub sender_type: u8,
    pub recipient: Address,
    pub recipient_type: u8,
    pub value: u64,
    pub fee: u64,
    pub validity_start_height: u32,
    pub network_id: u8,
    pub flags: u8,
}

impl Encode for TxContent {
    fn encode_to(&self, out: &mut Vec<u8>) {
        write_bytes_u16(out, &self.data);
        self.sender.encode_to(out);
        self.sender_type.encode_to(out);
        self.recipient.encode_to(out);
        self.recipient_type.encode_to(out);
        self.value.encode_to(out);
        self.fee.encode_to(out);
        self.validity_start_height.encode_to(out);
        self.network_id.encode_to(out);
        self.flags.encode_to(out);
    }

    fn encoded_size(&self) -> usize {
        2 + self.data.len() + 20 + 1 + 20 + 1 + 8 + 8 + 4 + 1 + 1
    }
}
