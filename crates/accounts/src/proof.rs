//! Signature proofs.
//!
//! A proof ties a signature to an account address. The address is not the
//! public key itself but the truncated root of a (possibly empty) Merkle
//! path over it, so multi-key wallets can authorize with any enrolled
//! key.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use nimiq_codec::{Decode, Encode, Reader};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::address::Address;
use crate::hash::{blake2b, Blake2bHash};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureProof {
    pub public_key: [u8; 32],
    pub merkle_path: MerklePath,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

impl SignatureProof {
    /// A proof for a single-key account (empty Merkle path).
    pub fn from_signature(public_key: [u8; 32], signature: [u8; 64]) -> Self {
        SignatureProof {
            public_key,
            merkle_path: MerklePath::default(),
            signature,
        }
    }

    /// The address this proof authorizes for: the Merkle root over the
    /// public key, truncated to 20 bytes.
    pub fn signer_address(&self) -> Address {
        let root = self.merkle_path.compute_root(&self.public_key);
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&root[..20]);
        Address(addr)
    }

    /// Cryptographically verify the signature over `message`.
    pub fn verify(&self, message: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.public_key) else {
            return false;
        };
        key.verify(message, &Signature::from_bytes(&self.signature))
            .is_ok()
    }
}

impl Encode for SignatureProof {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.public_key.encode_to(out);
        self.merkle_path.encode_to(out);
        self.signature.encode_to(out);
    }

    fn encoded_size(&self) -> usize {
        32 + self.merkle_path.encoded_size() + 64
    }
}

impl Decode for SignatureProof {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        Ok(SignatureProof {
            public_key: Decode::decode_from(r)?,
            merkle_path: MerklePath::decode_from(r)?,
            signature: Decode::decode_from(r)?,
        })
    }
}

/// Path from a leaf to the root of a hash tree: per level a direction bit
/// (set = sibling on the left) and the sibling hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MerklePath {
    pub branches: BitSet,
    pub hashes: Vec<Blake2bHash>,
}

impl MerklePath {
    /// Fold the leaf value up the path. The leaf is hashed alone first;
    /// every level is Blake2b-256 over the 64-byte concatenation.
    pub fn compute_root(&self, leaf_value: &[u8]) -> Blake2bHash {
        let mut root = blake2b(leaf_value);
        for (i, sibling) in self.hashes.iter().enumerate() {
            let mut node = [0u8; 64];
            if self.branches.bit(i as u8) {
                node[..32].copy_from_slice(sibling);
                node[32..].copy_from_slice(&root);
            } else {
                node[..32].copy_from_slice(&root);
                node[32..].copy_from_slice(sibling);
            }
            root = blake2b(&node);
        }
        root
    }
}

impl Encode for MerklePath {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.branches.encode_to(out);
        for hash in &self.hashes {
            hash.encode_to(out);
        }
    }

    fn encoded_size(&self) -> usize {
        self.branches.encoded_size() + self.hashes.len() * 32
    }
}

impl Decode for MerklePath {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        let branches = BitSet::decode_from(r)?;
        let mut hashes = Vec::with_capacity(branches.len as usize);
        for _ in 0..branches.len {
            hashes.push(Decode::decode_from(r)?);
        }
        Ok(MerklePath { branches, hashes })
    }
}

/// Fixed-capacity bit set: a length byte followed by ceil(len/8) bytes,
/// most significant bit first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitSet {
    pub len: u8,
    pub bits: Vec<u8>,
}

impl BitSet {
    pub fn bit(&self, i: u8) -> bool {
        self.bits[usize::from(i) / 8] & (0x80 >> (i % 8)) != 0
    }
}

impl Encode for BitSet {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.len);
        out.extend_from_slice(&self.bits);
    }

    fn encoded_size(&self) -> usize {
        1 + self.bits.len()
    }
}

impl Decode for BitSet {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        let len = r.take_u8()?;
        let bits = r.take(usize::from(len).div_ceil(8))?.to_vec();
        Ok(BitSet { len, bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    #[test]
    fn empty_path_root_is_the_leaf_hash() {
        let path = MerklePath::default();
        assert_eq!(path.compute_root(b"leaf"), blake2b(b"leaf"));
    }

    #[test]
    fn path_folds_with_direction_bits() {
        let sibling = [0x11u8; 32];
        // Direction bit 0 (MSB of the first byte) set: sibling left.
        let left = MerklePath {
            branches: BitSet {
                len: 1,
                bits: vec![0x80],
            },
            hashes: vec![sibling],
        };
        let mut node = [0u8; 64];
        node[..32].copy_from_slice(&sibling);
        node[32..].copy_from_slice(&blake2b(b"leaf"));
        assert_eq!(left.compute_root(b"leaf"), blake2b(&node));

        // Bit clear: sibling right.
        let right = MerklePath {
            branches: BitSet {
                len: 1,
                bits: vec![0x00],
            },
            hashes: vec![sibling],
        };
        let mut node = [0u8; 64];
        node[..32].copy_from_slice(&blake2b(b"leaf"));
        node[32..].copy_from_slice(&sibling);
        assert_eq!(right.compute_root(b"leaf"), blake2b(&node));
    }

    #[test]
    fn signer_address_matches_wallet_derivation() {
        let wallet = Wallet::from_seed(&[42u8; 32]);
        let proof = wallet.signature_proof(b"msg");
        assert_eq!(proof.signer_address(), wallet.address());
        assert!(proof.verify(b"msg"));
        assert!(!proof.verify(b"other"));
    }

    #[test]
    fn wire_round_trip() {
        let proof = SignatureProof {
            public_key: [7u8; 32],
            merkle_path: MerklePath {
                branches: BitSet {
                    len: 3,
                    bits: vec![0xa0],
                },
                hashes: vec![[1u8; 32], [2u8; 32], [3u8; 32]],
            },
            signature: [9u8; 64],
        };
        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), proof.encoded_size());
        assert_eq!(SignatureProof::from_bytes(&bytes).unwrap(), proof);
    }
}
