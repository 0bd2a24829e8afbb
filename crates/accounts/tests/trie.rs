//! Trie consensus vectors and order-invariance properties.

use nimiq_accounts::{Account, Address, BasicAccount, MemStore, Trie};
use nimiq_codec::Encode;
use proptest::prelude::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

const EMPTY_ROOT: &str = "ab29e6dc16755d0071eba349ebda225d15e4f910cb474549c47e95cb85ecc4d6";
const THREE_ROOT: &str = "c8a459ea666e3b027dbef89c00e7600d22c0a0c7ff8051a5e9687026d027c0f5";

fn addr(first: &[u8]) -> Address {
    let mut bytes = [0u8; 20];
    bytes[..first.len()].copy_from_slice(first);
    Address(bytes)
}

fn basic(value: u64) -> Vec<u8> {
    Account::Basic(BasicAccount { value }).to_bytes()
}

/// The three fixture entries of the reference vectors.
fn fixtures() -> [(Address, Vec<u8>); 3] {
    [
        (addr(&[]), basic(5)),
        (addr(&[0x10]), basic(55)),
        (addr(&[0x12]), basic(55_555_555)),
    ]
}

#[test]
fn empty_trie_root() {
    let trie = Trie::new(MemStore::new());
    assert_eq!(hex::encode(trie.root_hash()), EMPTY_ROOT);
}

#[test]
fn known_roots_after_each_insert() {
    let [(a1, v1), (a2, v2), (a3, v3)] = fixtures();
    let mut trie = Trie::new(MemStore::new());

    assert!(trie.put(&a1, &v1));
    assert_eq!(
        hex::encode(trie.root_hash()),
        "4644a8c8bc0b333230751e6fbcd0b49f4ebc7bb682df3a97e091115d0fe26c05"
    );

    assert!(trie.put(&a2, &v2));
    assert_eq!(
        hex::encode(trie.root_hash()),
        "f6fc7ecf89d94fa4e91a19805d36976ccd09633a95ff201981167e8c68c141dd"
    );

    assert!(trie.put(&a3, &v3));
    assert_eq!(hex::encode(trie.root_hash()), THREE_ROOT);
}

#[test]
fn all_insertion_orders_agree_and_deletion_restores_the_empty_root() {
    let entries = fixtures();
    let permutations: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for perm in permutations {
        let mut trie = Trie::new(MemStore::new());
        for &i in &perm {
            assert!(trie.put(&entries[i].0, &entries[i].1));
        }
        assert_eq!(hex::encode(trie.root_hash()), THREE_ROOT, "order {perm:?}");

        for &i in &perm {
            assert!(trie.delete(&entries[i].0));
        }
        assert_eq!(hex::encode(trie.root_hash()), EMPTY_ROOT, "order {perm:?}");
    }
}

fn arb_entries() -> impl Strategy<Value = Vec<([u8; 20], Vec<u8>)>> {
    prop::collection::hash_map(
        any::<[u8; 20]>(),
        prop::collection::vec(any::<u8>(), 1..24),
        1..24,
    )
    .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]

    #[test]
    fn root_depends_only_on_contents(entries in arb_entries(), seed in any::<u64>()) {
        let mut trie = Trie::new(MemStore::new());
        for (bytes, value) in &entries {
            prop_assert!(trie.put(&Address(*bytes), value));
        }
        let root = trie.root_hash();

        let mut shuffled = entries.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
        let mut reordered = Trie::new(MemStore::new());
        for (bytes, value) in &shuffled {
            reordered.put(&Address(*bytes), value);
        }
        prop_assert_eq!(reordered.root_hash(), root);

        // Lookups return exactly what was stored.
        for (bytes, value) in &entries {
            let got = trie.get(&Address(*bytes));
            prop_assert_eq!(got.as_ref(), Some(value));
        }
    }

    #[test]
    fn deleting_everything_restores_the_empty_root(entries in arb_entries(), seed in any::<u64>()) {
        let mut trie = Trie::new(MemStore::new());
        for (bytes, value) in &entries {
            trie.put(&Address(*bytes), value);
        }
        let mut order = entries.clone();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        for (bytes, _) in &order {
            prop_assert!(trie.delete(&Address(*bytes)));
            prop_assert_eq!(trie.get(&Address(*bytes)), None);
        }
        prop_assert_eq!(hex::encode(trie.root_hash()), EMPTY_ROOT);
    }

    #[test]
    fn interleaved_deletes_and_reinserts_converge(
        entries in arb_entries(),
        seed in any::<u64>(),
    ) {
        // Insert everything, delete a half, re-insert it in another
        // order: the root must match a trie built from the final set
        // directly.
        let mut rng = StdRng::seed_from_u64(seed);
        let mut trie = Trie::new(MemStore::new());
        for (bytes, value) in &entries {
            trie.put(&Address(*bytes), value);
        }
        let mut half = entries.clone();
        half.shuffle(&mut rng);
        half.truncate(entries.len() / 2);
        for (bytes, _) in &half {
            trie.delete(&Address(*bytes));
        }
        half.shuffle(&mut rng);
        for (bytes, value) in &half {
            trie.put(&Address(*bytes), value);
        }

        let mut direct = Trie::new(MemStore::new());
        for (bytes, value) in &entries {
            direct.put(&Address(*bytes), value);
        }
        prop_assert_eq!(trie.root_hash(), direct.root_hash());
    }

    #[test]
    fn absent_addresses_read_empty(entries in arb_entries(), probe in any::<[u8; 20]>()) {
        let mut trie = Trie::new(MemStore::new());
        for (bytes, value) in &entries {
            trie.put(&Address(*bytes), value);
        }
        if !entries.iter().any(|(bytes, _)| *bytes == probe) {
            prop_assert_eq!(trie.get(&Address(probe)), None);
            // Deleting it is a no-op.
            prop_assert!(!trie.delete(&Address(probe)));
        }
    }
}
