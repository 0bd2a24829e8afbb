//! Nimiq-compatible accounts subsystem: a hash-verified state trie keyed
//! by 20-byte addresses, the typed account model (basic accounts, vesting
//! and hashed time-locked contracts) and the atomic block-application
//! pipeline that ties them together.
//!
//! The trie's Blake2b-256 root hash is the `accounts_hash` committed in
//! every block header; it depends only on the stored entries, never on
//! the order they were written in.

pub mod account;
pub mod accounts;
pub mod address;
pub mod block;
pub mod hash;
pub mod htlc;
pub mod nibbles;
pub mod node;
pub mod policy;
pub mod proof;
pub mod store;
pub mod transaction;
pub mod tree;
pub mod wallet;

pub use account::{Account, AccountError, AccountType, BasicAccount, VestingContract};

pub use accounts::{Accounts, PruneReason, PushError};

pub use address::{Address, AddressError, ADDRESS_SIZE};

pub use block::{Block, BlockBody, BlockHeader, BlockInterlink, PrunedAccount};

pub use hash::{blake2b, Blake2bHash, Hash, HashAlgorithm};

pub use htlc::{HtlcContract, HtlcProof};

pub use nibbles::Nibbles;

pub use node::{Branch, Child, Leaf, Node, ZERO_HASH};

pub use proof::{BitSet, MerklePath, SignatureProof};

pub use store::{MemStore, OverlayStore, Store};

pub use transaction::{
    BasicTx, ExtendedTx, Transaction, TxContent, TX_FLAG_CONTRACT_CREATION, TX_TYPE_BASIC,
    TX_TYPE_EXTENDED,
};

pub use tree::Trie;

pub use wallet::{Wallet, WalletError};
