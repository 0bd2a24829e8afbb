//! Minimal single-key wallet.
//!
//! Software keys without any hardening; meant for tooling and tests, not
//! for real funds. Signing covers the encoded [`TxContent`] of the
//! transaction.

use ed25519_dalek::{Signer, SigningKey};
use nimiq_codec::Encode;

use crate::address::Address;
use crate::proof::SignatureProof;
use crate::transaction::{BasicTx, ExtendedTx, Transaction};

pub struct Wallet {
    signing_key: SigningKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("refusing to sign a transaction with a different sender")]
    ForeignSender,
}

impl Wallet {
    /// Derive the keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Wallet {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// A fresh random wallet.
    pub fn generate() -> Self {
        Wallet {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    fn sign_content(&self, tx: &Transaction) -> [u8; 64] {
        self.signing_key.sign(&tx.content().to_bytes()).to_bytes()
    }

    /// Fill in the signature of a basic transaction. The transaction's
    /// sender key must be this wallet's key.
    pub fn sign_basic(&self, tx: &mut BasicTx) -> Result<(), WalletError> {
        if tx.sender_pubkey != self.public_key() {
            return Err(WalletError::ForeignSender);
        }
        tx.signature = self.sign_content(&Transaction::Basic(tx.clone()));
        Ok(())
    }

    /// Attach a single-key signature proof to an extended transaction.
    pub fn sign_extended(&self, tx: &mut ExtendedTx) {
        let signature = self.sign_content(&Transaction::Extended(tx.clone()));
        tx.proof = SignatureProof::from_signature(self.public_key(), signature).to_bytes();
    }

    /// Sign an arbitrary message into a single-key signature proof.
    pub fn signature_proof(&self, message: &[u8]) -> SignatureProof {
        SignatureProof::from_signature(self.public_key(), self.signing_key.sign(message).to_bytes())
    }
}
