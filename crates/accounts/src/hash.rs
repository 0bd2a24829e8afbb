//! Consensus hashing primitives.
//!
//! All state commitments (trie nodes, addresses, signature proofs) use
//! Blake2b-256. The wire-level [`Hash`] container additionally carries an
//! algorithm tag because HTLC contracts commit to hash roots under a
//! choice of algorithms.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use nimiq_codec::{Decode, Encode, Reader};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};

pub(crate) type Blake2b256 = Blake2b<U32>;

/// A 32-byte Blake2b-256 digest.
pub type Blake2bHash = [u8; 32];

/// Blake2b-256 over `data`.
pub fn blake2b(data: &[u8]) -> Blake2bHash {
    let mut h = Blake2b256::new();
    h.update(data);
    h.finalize().into()
}

/// Hash algorithms that can appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum HashAlgorithm {
    Blake2b = 1,
    Argon2d = 2,
    Sha256 = 3,
    Sha512 = 4,
}

impl HashAlgorithm {
    /// Digest size in bytes.
    pub fn size(self) -> usize {
        match self {
            HashAlgorithm::Blake2b | HashAlgorithm::Argon2d | HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(HashAlgorithm::Blake2b),
            2 => Some(HashAlgorithm::Argon2d),
            3 => Some(HashAlgorithm::Sha256),
            4 => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }
}

/// An algorithm-tagged digest.
///
/// Wire layout: algorithm tag byte, then the digest bytes (size fixed by
/// the algorithm).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hash {
    pub algorithm: HashAlgorithm,
    pub bytes: Vec<u8>,
}

impl Hash {
    pub fn blake2b(bytes: Blake2bHash) -> Self {
        Hash {
            algorithm: HashAlgorithm::Blake2b,
            bytes: bytes.to_vec(),
        }
    }

    /// Digest `data` with this hash's algorithm.
    ///
    /// Argon2d digests are never recomputed by consensus code (they only
    /// occur as opaque commitments), so there is no computing arm for it.
    pub(crate) fn digest_with(algorithm: HashAlgorithm, data: &[u8]) -> Option<Vec<u8>> {
        match algorithm {
            HashAlgorithm::Blake2b => Some(blake2b(data).to_vec()),
            HashAlgorithm::Sha256 => Some(Sha256::digest(data).to_vec()),
            HashAlgorithm::Sha512 => Some(Sha512::digest(data).to_vec()),
            HashAlgorithm::Argon2d => None,
        }
    }
}

impl Encode for Hash {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.algorithm as u8);
        out.extend_from_slice(&self.bytes);
    }

    fn encoded_size(&self) -> usize {
        1 + self.bytes.len()
    }
}

impl Decode for Hash {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        let tag = r.take_u8()?;
        let algorithm =
            HashAlgorithm::from_tag(tag).ok_or(nimiq_codec::Error::InvalidTag { tag })?;
        let bytes = r.take(algorithm.size())?.to_vec();
        Ok(Hash { algorithm, bytes })
    }
}
