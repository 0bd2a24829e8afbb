//! The accounts state facade.
//!
//! [`Accounts`] owns the state trie and applies whole blocks to it. One
//! block is staged on an [`OverlayStore`]; only when every transition
//! succeeded and the resulting root hash matches the header commitment
//! are the buffered writes flushed to the backing store. Any error
//! discards the overlay, so no partial state is ever observable.
//!
//! Within a block the per-address order of effects is: outgoing credit
//! checks and debits, incoming credits, contract construction, prune
//! verification, miner reward.

use std::collections::HashMap;
use std::fmt;

use nimiq_codec::{Decode, Encode};

use crate::account::{Account, AccountError, AccountType, INITIAL_ACCOUNT};
use crate::address::Address;
use crate::block::{Block, BlockBody};
use crate::hash::Blake2bHash;
use crate::policy;
use crate::store::{MemStore, OverlayStore, Store};
use crate::transaction::{BasicTx, Transaction};
use crate::tree::Trie;

pub struct Accounts<S: Store = MemStore> {
    tree: Trie<S>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    #[error("block has no body")]
    MissingBody,
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("invalid prune of account {address}: {reason}")]
    InvalidPrune {
        address: Address,
        reason: PruneReason,
    },
    #[error("accounts hash mismatch: expected {}, got {}", hex::encode(.expected), hex::encode(.got))]
    AccountsHashMismatch {
        expected: Blake2bHash,
        got: Blake2bHash,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReason {
    /// A transaction emptied its sender but the block does not list it.
    Missing,
    /// The listed account state differs from the account being pruned.
    Altered,
    /// The block lists an account that was not emptied.
    Early,
}

impl fmt::Display for PruneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PruneReason::Missing => "account missing in prune list",
            PruneReason::Altered => "altered account in prune list",
            PruneReason::Early => "account pruned too early",
        })
    }
}

enum Direction {
    Outgoing,
    Incoming,
}

impl Accounts<MemStore> {
    /// An empty accounts state backed by memory.
    pub fn new() -> Self {
        Accounts {
            tree: Trie::new(MemStore::new()),
        }
    }
}

impl Default for Accounts<MemStore> {
    fn default() -> Self {
        Accounts::new()
    }
}

impl<S: Store> Accounts<S> {
    /// Wrap an existing store (which may already hold state).
    pub fn from_store(store: S) -> Self {
        Accounts {
            tree: Trie::new(store),
        }
    }

    /// The account at `address`. Absent entries read as the initial
    /// (empty basic) account.
    pub fn get(&self, address: &Address) -> Account {
        match self.tree.get(address) {
            None => INITIAL_ACCOUNT,
            // A stored account that fails to decode is a corrupted store,
            // not a recoverable condition.
            Some(buf) => Account::from_bytes(&buf)
                .unwrap_or_else(|e| panic!("corrupt account {address:?} in state: {e}")),
        }
    }

    /// Serialize `account` into the trie at `address`.
    pub fn put(&mut self, address: &Address, account: &Account) {
        self.tree.put(address, &account.to_bytes());
    }

    /// The trie root committed to by block headers.
    pub fn root_hash(&self) -> Blake2bHash {
        self.tree.root_hash()
    }

    /// Apply a block atomically.
    ///
    /// On success the staged writes are flushed to the backing store and
    /// the root hash equals the header's `accounts_hash`. On any error
    /// the state is left exactly as before the call.
    pub fn push(&mut self, block: &Block) -> Result<(), PushError> {
        let body = block.body.as_ref().ok_or(PushError::MissingBody)?;
        let height = block.header.height;

        let mut staged = Accounts {
            tree: Trie::new(OverlayStore::new(self.tree.store_mut())),
        };
        staged.apply_body(body, height)?;

        let root = staged.tree.root_hash();
        if root != block.header.accounts_hash {
            return Err(PushError::AccountsHashMismatch {
                expected: block.header.accounts_hash,
                got: root,
            });
        }

        let mut overlay = staged.tree.into_store();
        overlay.flush();
        log::debug!(
            "pushed block at height {height}: {} txs, root {}",
            body.txs.len(),
            hex::encode(root)
        );
        Ok(())
    }

    fn apply_body(&mut self, body: &BlockBody, height: u32) -> Result<(), PushError> {
        self.apply_senders(body, height)?;
        self.apply_recipients(body, height)?;
        self.create_contracts(body, height)?;
        self.prune_accounts(body)?;
        self.apply_inherents(body, height)
    }

    fn apply_senders(&mut self, body: &BlockBody, height: u32) -> Result<(), PushError> {
        for tx in &body.txs {
            let (address, sender_type) = tx.sender();
            self.apply_at(&address, sender_type, tx, height, Direction::Outgoing)?;
        }
        Ok(())
    }

    fn apply_recipients(&mut self, body: &BlockBody, height: u32) -> Result<(), PushError> {
        for tx in &body.txs {
            let (address, recipient_type) = tx.recipient();
            // A contract under creation does not exist yet; the credit
            // lands on the (virtual) basic account and the type check
            // against the declared contract type happens at creation.
            let effective_type = if tx.is_contract_creation() {
                AccountType::Basic as u8
            } else {
                recipient_type
            };
            self.apply_at(&address, effective_type, tx, height, Direction::Incoming)?;
        }
        Ok(())
    }

    fn create_contracts(&mut self, body: &BlockBody, height: u32) -> Result<(), PushError> {
        for tx in &body.txs {
            if !tx.is_contract_creation() {
                continue;
            }
            let (address, recipient_type) = tx.recipient();
            let prev_balance = self.get(&address).balance();
            let contract = Account::create(recipient_type, tx, height, prev_balance)?;
            self.put(&address, &contract);
        }
        Ok(())
    }

    /// Verify the block's prune list against the senders that were
    /// actually emptied, and delete them from the trie.
    fn prune_accounts(&mut self, body: &BlockBody) -> Result<(), PushError> {
        let mut listed: HashMap<Address, &Account> = body
            .pruned
            .iter()
            .map(|p| (p.address, &p.account))
            .collect();

        for tx in &body.txs {
            let (address, _) = tx.sender();
            let sender = self.get(&address);
            if !sender.is_empty() {
                continue;
            }
            match listed.remove(&address) {
                None => {
                    return Err(PushError::InvalidPrune {
                        address,
                        reason: PruneReason::Missing,
                    })
                }
                Some(account) if *account != sender => {
                    return Err(PushError::InvalidPrune {
                        address,
                        reason: PruneReason::Altered,
                    })
                }
                Some(_) => {
                    self.tree.delete(&address);
                }
            }
        }

        // Everything the block claims to prune must have been emptied.
        if let Some(address) = listed.keys().min().copied() {
            return Err(PushError::InvalidPrune {
                address,
                reason: PruneReason::Early,
            });
        }
        Ok(())
    }

    /// Mint the block reward plus all fees to the miner.
    fn apply_inherents(&mut self, body: &BlockBody, height: u32) -> Result<(), PushError> {
        let fees = body
            .txs
            .iter()
            .fold(0u64, |sum, tx| sum.saturating_add(tx.fee()));
        let reward = policy::block_reward(height).saturating_add(fees);
        let coinbase = Transaction::Basic(BasicTx {
            sender_pubkey: [0u8; 32],
            recipient: body.miner,
            value: reward,
            fee: 0,
            validity_start_height: height,
            network_id: 0,
            signature: [0u8; 64],
        });
        self.apply_at(
            &body.miner,
            AccountType::Basic as u8,
            &coinbase,
            height,
            Direction::Incoming,
        )
    }

    fn apply_at(
        &mut self,
        address: &Address,
        expected_type: u8,
        tx: &Transaction,
        height: u32,
        direction: Direction,
    ) -> Result<(), PushError> {
        let account = self.get(address);
        let got = account.account_type() as u8;
        if expected_type != got {
            return Err(AccountError::TypeMismatch {
                expected: expected_type,
                got,
            }
            .into());
        }
        let next = match direction {
            Direction::Outgoing => account.apply_outgoing(tx, height)?,
            Direction::Incoming => account.apply_incoming(tx, height)?,
        };
        self.put(address, &next);
        Ok(())
    }
}
