//! Hashed time-locked contracts.
//!
//! An HTLC locks funds between a sender and a recipient. The recipient
//! claims tranches by revealing preimages of the committed hash root; the
//! parties can settle early together, and the sender reclaims the rest
//! after the timeout.

use nimiq_codec::{Decode, Encode, Reader};
use serde::{Deserialize, Serialize};

use crate::account::AccountError;
use crate::address::Address;
use crate::hash::{Hash, HashAlgorithm};
use crate::proof::SignatureProof;
use crate::transaction::{ExtendedTx, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcContract {
    pub value: u64,
    pub sender: Address,
    pub recipient: Address,
    pub hash_root: Hash,
    pub hash_count: u8,
    pub timeout: u32,
    pub total_amount: u64,
}

/// Settlement proof carried by an outgoing HTLC transaction, tagged by
/// its first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtlcProof {
    /// The recipient claims a tranche by revealing a preimage at some
    /// depth of the hash chain.
    RegularTransfer {
        hash_depth: u8,
        hash_root: Hash,
        pre_image: Hash,
        recipient_sig: SignatureProof,
    },
    /// Both parties settle the remaining funds before the timeout.
    EarlyResolve {
        recipient_sig: SignatureProof,
        sender_sig: SignatureProof,
    },
    /// The sender reclaims the funds once the timeout has passed.
    TimeoutResolve { sender_sig: SignatureProof },
}

const PROOF_REGULAR_TRANSFER: u8 = 1;
const PROOF_EARLY_RESOLVE: u8 = 2;
const PROOF_TIMEOUT_RESOLVE: u8 = 3;

impl Encode for HtlcProof {
    fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            HtlcProof::RegularTransfer {
                hash_depth,
                hash_root,
                pre_image,
                recipient_sig,
            } => {
                out.push(PROOF_REGULAR_TRANSFER);
                hash_depth.encode_to(out);
                hash_root.encode_to(out);
                pre_image.encode_to(out);
                recipient_sig.encode_to(out);
            }
            HtlcProof::EarlyResolve {
                recipient_sig,
                sender_sig,
            } => {
                out.push(PROOF_EARLY_RESOLVE);
                recipient_sig.encode_to(out);
                sender_sig.encode_to(out);
            }
            HtlcProof::TimeoutResolve { sender_sig } => {
                out.push(PROOF_TIMEOUT_RESOLVE);
                sender_sig.encode_to(out);
            }
        }
    }

    fn encoded_size(&self) -> usize {
        1 + match self {
            HtlcProof::RegularTransfer {
                hash_root,
                pre_image,
                recipient_sig,
                ..
            } => 1 + hash_root.encoded_size() + pre_image.encoded_size() + recipient_sig.encoded_size(),
            HtlcProof::EarlyResolve {
                recipient_sig,
                sender_sig,
            } => recipient_sig.encoded_size() + sender_sig.encoded_size(),
            HtlcProof::TimeoutResolve { sender_sig } => sender_sig.encoded_size(),
        }
    }
}

impl Decode for HtlcProof {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        match r.take_u8()? {
            PROOF_REGULAR_TRANSFER => Ok(HtlcProof::RegularTransfer {
                hash_depth: u8::decode_from(r)?,
                hash_root: Hash::decode_from(r)?,
                pre_image: Hash::decode_from(r)?,
                recipient_sig: SignatureProof::decode_from(r)?,
            }),
            PROOF_EARLY_RESOLVE => Ok(HtlcProof::EarlyResolve {
                recipient_sig: SignatureProof::decode_from(r)?,
                sender_sig: SignatureProof::decode_from(r)?,
            }),
            PROOF_TIMEOUT_RESOLVE => Ok(HtlcProof::TimeoutResolve {
                sender_sig: SignatureProof::decode_from(r)?,
            }),
            tag => Err(nimiq_codec::Error::InvalidTag { tag }),
        }
    }
}

impl HtlcContract {
    /// Creation data: `{sender, recipient, hash, hash_count, timeout}`,
    /// consuming the whole blob. A zero hash count is rejected.
    pub(crate) fn init(
        ext: &ExtendedTx,
        _height: u32,
        prev_balance: u64,
    ) -> Result<Self, AccountError> {
        let mut r = Reader::new(&ext.data);
        let decoded = (|| -> nimiq_codec::Result<(Address, Address, Hash, u8, u32)> {
            let sender = Address::decode_from(&mut r)?;
            let recipient = Address::decode_from(&mut r)?;
            let hash = Hash::decode_from(&mut r)?;
            let hash_count = u8::decode_from(&mut r)?;
            let timeout = u32::decode_from(&mut r)?;
            if r.remaining() > 0 {
                return Err(nimiq_codec::Error::TrailingBytes {
                    remaining: r.remaining(),
                });
            }
            Ok((sender, recipient, hash, hash_count, timeout))
        })();
        let (sender, recipient, hash_root, hash_count, timeout) =
            decoded.map_err(|_| AccountError::InvalidCreationData)?;
        if hash_count == 0 {
            return Err(AccountError::InvalidCreationData);
        }
        Ok(HtlcContract {
            value: prev_balance,
            sender,
            recipient,
            hash_root,
            hash_count,
            timeout,
            total_amount: ext.value,
        })
    }

    pub(crate) fn apply_outgoing(
        &self,
        tx: &Transaction,
        height: u32,
    ) -> Result<Self, AccountError> {
        let ext = tx.as_extended().ok_or(AccountError::InvalidForSender)?;
        if ext.value > self.value {
            return Err(AccountError::Overspend {
                available: self.value,
                spend: ext.value,
            });
        }
        let new_value = self.value - ext.value;

        match HtlcProof::from_bytes(&ext.proof)? {
            HtlcProof::RegularTransfer {
                hash_depth,
                hash_root,
                pre_image,
                recipient_sig,
            } => {
                if hash_root != self.hash_root || hash_depth > self.hash_count {
                    return Err(AccountError::InvalidProof);
                }
                verify_preimage_chain(&hash_root, &pre_image, hash_depth)?;
                // Each revealed chain level releases one tranche of the
                // total; the rest must stay locked. Same truncated-double
                // arithmetic as the vesting schedule.
                let locked_levels = u32::from(self.hash_count - hash_depth);
                let min_cap = (f64::from(locked_levels) / f64::from(self.hash_count)
                    * self.total_amount as f64)
                    .ceil() as u64;
                if new_value < min_cap {
                    return Err(AccountError::Overspend {
                        available: self.value.saturating_sub(min_cap),
                        spend: ext.value,
                    });
                }
                if recipient_sig.signer_address() != self.recipient {
                    return Err(AccountError::InvalidSignature);
                }
            }
            HtlcProof::EarlyResolve {
                recipient_sig,
                sender_sig,
            } => {
                if recipient_sig.signer_address() != self.recipient
                    || sender_sig.signer_address() != self.sender
                {
                    return Err(AccountError::InvalidSignature);
                }
            }
            HtlcProof::TimeoutResolve { sender_sig } => {
                if height < self.timeout {
                    return Err(AccountError::InvalidProof);
                }
                if sender_sig.signer_address() != self.sender {
                    return Err(AccountError::InvalidSignature);
                }
            }
        }

        Ok(HtlcContract {
            value: new_value,
            ..self.clone()
        })
    }
}

/// Check that hashing `pre_image` `hash_depth` times yields `hash_root`.
/// Argon2d roots cannot be verified and are rejected outright.
fn verify_preimage_chain(
    hash_root: &Hash,
    pre_image: &Hash,
    hash_depth: u8,
) -> Result<(), AccountError> {
    if pre_image.algorithm != hash_root.algorithm
        || hash_root.algorithm == HashAlgorithm::Argon2d
    {
        return Err(AccountError::InvalidProof);
    }
    let mut current = pre_image.bytes.clone();
    for _ in 0..hash_depth {
        current = Hash::digest_with(hash_root.algorithm, &current)
            .ok_or(AccountError::InvalidProof)?;
    }
    if current != hash_root.bytes {
        return Err(AccountError::InvalidProof);
    }
    Ok(())
}
