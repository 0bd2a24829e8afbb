//! Typed account model and state transitions.
//!
//! Every account is one of three closed variants. The three transition
//! operations are total functions: they either return the successor
//! account value or a typed error, and they never mutate in place. The
//! wire encoding is a type tag byte followed by the variant's fields in
//! declaration order.

use nimiq_codec::{Decode, Encode, Reader};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::htlc::HtlcContract;
use crate::proof::SignatureProof;
use crate::transaction::{ExtendedTx, Transaction};

/// Account type tags as they appear on the wire. Tag `3` is reserved for
/// a future staking contract and decodes as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccountType {
    Basic = 0,
    Vesting = 1,
    Htlc = 2,
}

impl AccountType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(AccountType::Basic),
            1 => Some(AccountType::Vesting),
            2 => Some(AccountType::Htlc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("account type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: u8, got: u8 },
    #[error("trying to spend {spend} but only {available} is available")]
    Overspend { available: u64, spend: u64 },
    #[error("transaction not valid for the sender account type")]
    InvalidForSender,
    #[error("transaction not valid for the recipient account type")]
    InvalidForRecipient,
    #[error("signer address does not match the required address")]
    InvalidSignature,
    #[error("malformed contract creation data")]
    InvalidCreationData,
    #[error("invalid settlement proof")]
    InvalidProof,
    #[error(transparent)]
    Codec(#[from] nimiq_codec::Error),
}

/// A stored account: either plain funds or one of the two contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Account {
    Basic(BasicAccount),
    Vesting(VestingContract),
    Htlc(HtlcContract),
}

/// The state every address starts from: no funds, basic type. Never
/// stored in the trie.
pub const INITIAL_ACCOUNT: Account = Account::Basic(BasicAccount { value: 0 });

impl Account {
    pub fn balance(&self) -> u64 {
        match self {
            Account::Basic(a) => a.value,
            Account::Vesting(c) => c.value,
            Account::Htlc(c) => c.value,
        }
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            Account::Basic(_) => AccountType::Basic,
            Account::Vesting(_) => AccountType::Vesting,
            Account::Htlc(_) => AccountType::Htlc,
        }
    }

    /// Empty accounts are equivalent to absent entries and must be
    /// pruned by the block that emptied them.
    pub fn is_empty(&self) -> bool {
        self.balance() == 0
    }

    /// Construct a fresh contract for a contract-creation transaction.
    /// `prev_balance` is the recipient balance after the incoming credit.
    pub fn create(
        recipient_type: u8,
        tx: &Transaction,
        height: u32,
        prev_balance: u64,
    ) -> Result<Account, AccountError> {
        let ext = tx.as_extended().ok_or(AccountError::InvalidForRecipient)?;
        match AccountType::from_tag(recipient_type) {
            Some(AccountType::Vesting) => {
                Ok(Account::Vesting(VestingContract::init(ext, height, prev_balance)?))
            }
            Some(AccountType::Htlc) => {
                Ok(Account::Htlc(HtlcContract::init(ext, height, prev_balance)?))
            }
            // Contract creation into a basic account (or an unassigned
            // type tag) has no meaning.
            Some(AccountType::Basic) | None => Err(AccountError::InvalidForRecipient),
        }
    }

    /// Debit path: the successor account after `tx` leaves this one.
    pub fn apply_outgoing(&self, tx: &Transaction, height: u32) -> Result<Account, AccountError> {
        match self {
            Account::Basic(a) => a.apply_outgoing(tx).map(Account::Basic),
            Account::Vesting(c) => c.apply_outgoing(tx, height).map(Account::Vesting),
            Account::Htlc(c) => c.apply_outgoing(tx, height).map(Account::Htlc),
        }
    }

    /// Credit path: the successor account after `tx` arrives here.
    pub fn apply_incoming(&self, tx: &Transaction, _height: u32) -> Result<Account, AccountError> {
        match self {
            Account::Basic(a) => Ok(Account::Basic(a.apply_incoming(tx))),
            // Contracts only ever receive their initial funding, which is
            // part of creation; later credits are invalid.
            Account::Vesting(_) | Account::Htlc(_) => Err(AccountError::InvalidForRecipient),
        }
    }
}

impl Encode for Account {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.account_type() as u8);
        match self {
            Account::Basic(a) => a.value.encode_to(out),
            Account::Vesting(c) => {
                c.value.encode_to(out);
                c.owner.encode_to(out);
                c.vesting_start.encode_to(out);
                c.step_blocks.encode_to(out);
                c.step_amount.encode_to(out);
                c.total_amount.encode_to(out);
            }
            Account::Htlc(c) => {
                c.value.encode_to(out);
                c.sender.encode_to(out);
                c.recipient.encode_to(out);
                c.hash_root.encode_to(out);
                c.hash_count.encode_to(out);
                c.timeout.encode_to(out);
                c.total_amount.encode_to(out);
            }
        }
    }

    fn encoded_size(&self) -> usize {
        1 + match self {
            Account::Basic(_) => 8,
            Account::Vesting(_) => 8 + 20 + 4 + 4 + 8 + 8,
            Account::Htlc(c) => 8 + 20 + 20 + c.hash_root.encoded_size() + 1 + 4 + 8,
        }
    }
}

impl Decode for Account {
    fn decode_from(r: &mut Reader<'_>) -> nimiq_codec::Result<Self> {
        let tag = r.take_u8()?;
        match AccountType::from_tag(tag) {
            Some(AccountType::Basic) => Ok(Account::Basic(BasicAccount {
                value: u64::decode_from(r)?,
            })),
            Some(AccountType::Vesting) => Ok(Account::Vesting(VestingContract {
                value: u64::decode_from(r)?,
                owner: Address::decode_from(r)?,
                vesting_start: u32::decode_from(r)?,
                step_blocks: u32::decode_from(r)?,
                step_amount: u64::decode_from(r)?,
                total_amount: u64::decode_from(r)?,
            })),
            Some(AccountType::Htlc) => Ok(Account::Htlc(HtlcContract {
                value: u64::decode_from(r)?,
                sender: Address::decode_from(r)?,
                recipient: Address::decode_from(r)?,
                hash_root: crate::hash::Hash::decode_from(r)?,
                hash_count: u8::decode_from(r)?,
                timeout: u32::decode_from(r)?,
                total_amount: u64::decode_from(r)?,
            })),
            None => Err(nimiq_codec::Error::InvalidTag { tag }),
        }
    }
}

/// Plain funds controlled by an Ed25519 key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAccount {
    pub value: u64,
}

impl BasicAccount {
    fn apply_outgoing(&self, tx: &Transaction) -> Result<BasicAccount, AccountError> {
        // Saturation only triggers past any storable balance, where the
        // overspend check fails anyway.
        let spend = tx.value().saturating_add(tx.fee());
        if spend > self.value {
            return Err(AccountError::Overspend {
                available: self.value,
                spend,
            });
        }
        Ok(BasicAccount {
            value: self.value - spend,
        })
    }

    fn apply_incoming(&self, tx: &Transaction) -> BasicAccount {
        BasicAccount {
            value: self.value.saturating_add(tx.value()),
        }
    }
}

/// Funds that unlock on a block-height schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingContract {
    pub value: u64,
    pub owner: Address,
    pub vesting_start: u32,
    pub step_blocks: u32,
    pub step_amount: u64,
    pub total_amount: u64,
}

impl VestingContract {
    /// Creation data comes in three sizes, distinguished by length:
    /// 24 bytes `{owner, step_blocks}`, 36 bytes `{owner, start,
    /// step_blocks, step_amount}`, 44 bytes adds `total_amount`.
    fn init(ext: &ExtendedTx, _height: u32, prev_balance: u64) -> Result<Self, AccountError> {
        let mut r = Reader::new(&ext.data);
        let decoded = (|| -> nimiq_codec::Result<VestingContract> {
            let owner = Address::decode_from(&mut r)?;
            Ok(match ext.data.len() {
                24 => VestingContract {
                    value: prev_balance,
                    owner,
                    vesting_start: 0,
                    step_blocks: u32::decode_from(&mut r)?,
                    step_amount: ext.value,
                    total_amount: ext.value,
                },
                36 => VestingContract {
                    value: prev_balance,
                    owner,
                    vesting_start: u32::decode_from(&mut r)?,
                    step_blocks: u32::decode_from(&mut r)?,
                    step_amount: u64::decode_from(&mut r)?,
                    total_amount: ext.value,
                },
                44 => VestingContract {
                    value: prev_balance,
                    owner,
                    vesting_start: u32::decode_from(&mut r)?,
                    step_blocks: u32::decode_from(&mut r)?,
                    step_amount: u64::decode_from(&mut r)?,
                    total_amount: u64::decode_from(&mut r)?,
                },
                _ => return Err(nimiq_codec::Error::UnexpectedEof),
            })
        })();
        decoded.map_err(|_| AccountError::InvalidCreationData)
    }

    /// Funds unlocked at `height`, capped at the current balance.
    ///
    /// The schedule is computed in IEEE-754 doubles with truncation
    /// toward zero, matching the historical consensus arithmetic bit for
    /// bit. Do not replace with integer math: the two only agree while
    /// the product stays within the 53-bit mantissa.
    pub fn amount_unlocked(&self, height: u32) -> u64 {
        if height <= self.vesting_start {
            return 0;
        }
        if self.step_blocks == 0 || self.step_amount == 0 {
            return self.value;
        }
        let progress = f64::from(height - self.vesting_start) / f64::from(self.step_blocks);
        let unlocked = (progress * self.step_amount as f64) as u64;
        unlocked.min(self.value)
    }

    fn apply_outgoing(&self, tx: &Transaction, height: u32) -> Result<Self, AccountError> {
        let ext = tx.as_extended().ok_or(AccountError::InvalidForSender)?;
        let unlocked = self.amount_unlocked(height);
        if ext.value > unlocked {
            return Err(AccountError::Overspend {
                available: unlocked,
                spend: ext.value,
            });
        }
        // The proof must carry the owner's signature.
        let proof = SignatureProof::from_bytes(&ext.proof)?;
        if proof.signer_address() != self.owner {
            return Err(AccountError::InvalidSignature);
        }
        Ok(VestingContract {
            value: self.value - ext.value,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{BasicTx, TX_FLAG_CONTRACT_CREATION};
    use crate::wallet::Wallet;

    fn basic_tx(value: u64, fee: u64) -> Transaction {
        Transaction::Basic(BasicTx {
            sender_pubkey: [0u8; 32],
            recipient: Address::default(),
            value,
            fee,
            validity_start_height: 0,
            network_id: 42,
            signature: [0u8; 64],
        })
    }

    fn creation_tx(data: Vec<u8>, value: u64) -> Transaction {
        Transaction::Extended(ExtendedTx {
            sender: Address([1u8; 20]),
            sender_type: AccountType::Basic as u8,
            recipient: Address([2u8; 20]),
            recipient_type: AccountType::Vesting as u8,
            value,
            fee: 0,
            validity_start_height: 1,
            flags: TX_FLAG_CONTRACT_CREATION,
            data,
            proof: Vec::new(),
            network_id: 42,
        })
    }

    #[test]
    fn basic_conserves_value_and_fee() {
        let account = Account::Basic(BasicAccount { value: 1000 });
        let after = account.apply_outgoing(&basic_tx(400, 100), 1).unwrap();
        assert_eq!(after.balance(), 500);

        let after = after.apply_incoming(&basic_tx(250, 9), 1).unwrap();
        assert_eq!(after.balance(), 750);
    }

    #[test]
    fn basic_overspend_fails_and_leaves_no_successor() {
        let account = Account::Basic(BasicAccount { value: 100 });
        assert_eq!(
            account.apply_outgoing(&basic_tx(100, 1), 1).unwrap_err(),
            AccountError::Overspend {
                available: 100,
                spend: 101
            }
        );
        // Boundary: exactly the balance drains to zero (and would need
        // pruning).
        let drained = account.apply_outgoing(&basic_tx(99, 1), 1).unwrap();
        assert!(drained.is_empty());
    }

    #[test]
    fn vesting_init_accepts_the_three_layouts() {
        let owner = Address([9u8; 20]);

        let mut data = owner.0.to_vec();
        data.extend_from_slice(&100u32.to_be_bytes());
        let acc = Account::create(1, &creation_tx(data, 5000), 1, 5000).unwrap();
        let Account::Vesting(c) = &acc else {
            panic!("expected vesting contract")
        };
        assert_eq!(c.owner, owner);
        assert_eq!(c.vesting_start, 0);
        assert_eq!(c.step_blocks, 100);
        assert_eq!(c.step_amount, 5000);
        assert_eq!(c.total_amount, 5000);
        assert_eq!(c.value, 5000);

        let mut data = owner.0.to_vec();
        data.extend_from_slice(&7u32.to_be_bytes());
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(&250u64.to_be_bytes());
        let acc = Account::create(1, &creation_tx(data, 5000), 1, 5000).unwrap();
        let Account::Vesting(c) = &acc else {
            panic!("expected vesting contract")
        };
        assert_eq!((c.vesting_start, c.step_blocks, c.step_amount), (7, 100, 250));
        assert_eq!(c.total_amount, 5000);

        let mut data = owner.0.to_vec();
        data.extend_from_slice(&7u32.to_be_bytes());
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(&250u64.to_be_bytes());
        data.extend_from_slice(&9999u64.to_be_bytes());
        let acc = Account::create(1, &creation_tx(data, 5000), 1, 5000).unwrap();
        let Account::Vesting(c) = &acc else {
            panic!("expected vesting contract")
        };
        assert_eq!(c.total_amount, 9999);
    }

    #[test]
    fn vesting_init_rejects_other_lengths() {
        for len in [0usize, 23, 25, 35, 43, 45, 64] {
            let err = Account::create(1, &creation_tx(vec![0u8; len], 10), 1, 10).unwrap_err();
            assert_eq!(err, AccountError::InvalidCreationData, "len {len}");
        }
    }

    #[test]
    fn contract_creation_into_basic_is_invalid() {
        assert_eq!(
            Account::create(0, &creation_tx(vec![0u8; 24], 10), 1, 10).unwrap_err(),
            AccountError::InvalidForRecipient
        );
        assert_eq!(
            Account::create(0xff, &creation_tx(vec![0u8; 24], 10), 1, 10).unwrap_err(),
            AccountError::InvalidForRecipient
        );
    }

    #[test]
    fn vesting_unlock_schedule() {
        let contract = VestingContract {
            value: 1000,
            owner: Address::default(),
            vesting_start: 100,
            step_blocks: 10,
            step_amount: 250,
            total_amount: 1000,
        };
        // Nothing unlocks at or before the start.
        assert_eq!(contract.amount_unlocked(0), 0);
        assert_eq!(contract.amount_unlocked(100), 0);
        // The schedule is a truncated double product, so partial steps
        // unlock proportionally: 1.9 steps of 250 are 475.
        assert_eq!(contract.amount_unlocked(110), 250);
        assert_eq!(contract.amount_unlocked(115), 375);
        assert_eq!(contract.amount_unlocked(119), 475);
        assert_eq!(contract.amount_unlocked(120), 500);
        // Capped at the balance from here on.
        assert_eq!(contract.amount_unlocked(140), 1000);
        assert_eq!(contract.amount_unlocked(1_000_000), 1000);

        // Zero step parameters unlock everything immediately past start.
        let immediate = VestingContract {
            step_blocks: 0,
            ..contract.clone()
        };
        assert_eq!(immediate.amount_unlocked(101), 1000);
    }

    #[test]
    fn vesting_outgoing_checks_unlock_and_owner() {
        let wallet = Wallet::from_seed(&[7u8; 32]);
        let contract = VestingContract {
            value: 1000,
            owner: wallet.address(),
            vesting_start: 100,
            step_blocks: 10,
            step_amount: 250,
            total_amount: 1000,
        };

        let mut tx = ExtendedTx {
            sender: Address([3u8; 20]),
            sender_type: AccountType::Vesting as u8,
            recipient: Address([4u8; 20]),
            recipient_type: AccountType::Basic as u8,
            value: 400,
            fee: 0,
            validity_start_height: 120,
            flags: 0,
            data: Vec::new(),
            proof: Vec::new(),
            network_id: 42,
        };
        wallet.sign_extended(&mut tx);
        let tx = Transaction::Extended(tx);

        // Before enough steps have passed the spend is locked.
        assert_eq!(
            Account::Vesting(contract.clone())
                .apply_outgoing(&tx, 110)
                .unwrap_err(),
            AccountError::Overspend {
                available: 250,
                spend: 400
            }
        );
        // After two steps 500 are unlocked.
        let after = Account::Vesting(contract.clone())
            .apply_outgoing(&tx, 120)
            .unwrap();
        assert_eq!(after.balance(), 600);
        assert_eq!(after.account_type(), AccountType::Vesting);

        // A proof from a different key fails the owner check.
        let stranger = Wallet::from_seed(&[8u8; 32]);
        let mut bad = match &tx {
            Transaction::Extended(ext) => ext.clone(),
            _ => unreachable!(),
        };
        stranger.sign_extended(&mut bad);
        assert_eq!(
            Account::Vesting(contract)
                .apply_outgoing(&Transaction::Extended(bad), 120)
                .unwrap_err(),
            AccountError::InvalidSignature
        );
    }

    #[test]
    fn incoming_to_contracts_is_invalid() {
        let contract = Account::Vesting(VestingContract {
            value: 10,
            owner: Address::default(),
            vesting_start: 0,
            step_blocks: 0,
            step_amount: 0,
            total_amount: 10,
        });
        assert_eq!(
            contract.apply_incoming(&basic_tx(5, 0), 1).unwrap_err(),
            AccountError::InvalidForRecipient
        );
    }

    #[test]
    fn account_wire_round_trip() {
        let accounts = [
            Account::Basic(BasicAccount { value: 5 }),
            Account::Vesting(VestingContract {
                value: 77,
                owner: Address([5u8; 20]),
                vesting_start: 1,
                step_blocks: 2,
                step_amount: 3,
                total_amount: 4,
            }),
            Account::Htlc(HtlcContract {
                value: 99,
                sender: Address([6u8; 20]),
                recipient: Address([7u8; 20]),
                hash_root: crate::hash::Hash::blake2b([8u8; 32]),
                hash_count: 2,
                timeout: 1000,
                total_amount: 99,
            }),
        ];
        for account in &accounts {
            let bytes = account.to_bytes();
            assert_eq!(bytes.len(), account.encoded_size());
            assert_eq!(&Account::from_bytes(&bytes).unwrap(), account);
        }
    }

    #[test]
    fn reserved_and_unknown_tags_fail_decoding() {
        assert_eq!(
            Account::from_bytes(&[3, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap_err(),
            nimiq_codec::Error::InvalidTag { tag: 3 }
        );
        assert_eq!(
            Account::from_bytes(&[0xab]).unwrap_err(),
            nimiq_codec::Error::InvalidTag { tag: 0xab }
        );
    }
}
