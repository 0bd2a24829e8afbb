//! Patricia–Merkle trie over 20-byte addresses.
//!
//! Leaves always sit at depth 40 (the full address path); branches carry
//! the shared prefix of their subtree and at least two children, except
//! for the root branch, which always exists at the empty path. Child
//! hashes are cached inline in the branch and set to [`ZERO_HASH`] when
//! stale; [`Trie::put`] recomputes them bottom-up before returning, so
//! the root hash always reflects the latest contents.
//!
//! The shape of the trie, and therefore its root hash, depends only on
//! the set of stored entries, never on their insertion order.

use crate::address::Address;
use crate::hash::Blake2bHash;
use crate::nibbles::Nibbles;
use crate::node::{Branch, Node, ZERO_HASH};
use crate::store::Store;

pub struct Trie<S> {
    store: S,
}

impl<S: Store> Trie<S> {
    /// Wrap a store, seeding the root branch if the store is empty.
    pub fn new(mut store: S) -> Self {
        if store.get(&Nibbles::empty()).is_none() {
            store.put(
                Nibbles::empty(),
                Node::Branch(Branch::new(Nibbles::empty())),
            );
        }
        Trie { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The value stored at `addr`, or `None` when absent.
    pub fn get(&self, addr: &Address) -> Option<Vec<u8>> {
        match self.store.get(&Nibbles::from_address(addr)) {
            None => None,
            Some(Node::Leaf(leaf)) => Some(leaf.value),
            Some(Node::Branch(_)) => panic!("branch stored at full-depth path"),
        }
    }

    /// Upsert the value at `addr`; an empty value deletes the entry.
    ///
    /// Returns whether the trie changed. No-op writes (deleting an absent
    /// key, re-inserting the identical value) return `false` without
    /// touching the store.
    pub fn put(&mut self, addr: &Address, value: &[u8]) -> bool {
        let prefix = Nibbles::from_address(addr);
        match self.store.get(&prefix) {
            None if value.is_empty() => return false,
            Some(Node::Leaf(leaf)) if leaf.value == value => return false,
            _ => {}
        }
        self.update(prefix, value.to_vec());
        self.update_hashes(&Nibbles::empty());
        true
    }

    /// Remove the entry at `addr`. Returns whether it existed.
    pub fn delete(&mut self, addr: &Address) -> bool {
        self.put(addr, &[])
    }

    /// The Blake2b-256 root hash.
    pub fn root_hash(&self) -> Blake2bHash {
        match self.store.get(&Nibbles::empty()) {
            Some(Node::Branch(root)) => root.hash(),
            _ => panic!("trie root must be a branch"),
        }
    }

    /// Descend from the root towards `prefix` and add, replace or remove
    /// the leaf there. `root_path` collects the paths of the branches
    /// descended through; any mutation walks it back up to invalidate the
    /// cached hashes.
    fn update(&mut self, prefix: Nibbles, value: Vec<u8>) {
        let mut root_path: Vec<Nibbles> = Vec::new();
        let mut node_prefix = Nibbles::empty();
        loop {
            if !node_prefix.is_prefix_of(&prefix) {
                // The current node diverges from the target path: split.
                // The new leaf and the existing node become the two
                // children of a fresh branch at the shared prefix.
                debug_assert!(!value.is_empty(), "cannot split while deleting");
                self.store
                    .put(prefix.clone(), Node::leaf(prefix.clone(), value));
                let common = node_prefix.common_prefix(&prefix);
                let mut parent = Branch::new(common.clone());
                parent.put_child(node_prefix.suffix_from(common.len()), ZERO_HASH);
                parent.put_child(prefix.suffix_from(common.len()), ZERO_HASH);
                self.store.put(common.clone(), Node::Branch(parent));
                self.invalidate_path(common, root_path);
                return;
            }
            if node_prefix == prefix {
                // Exact hit: replace the leaf value or delete it.
                if value.is_empty() {
                    self.store.del(&prefix);
                    self.prune(prefix, root_path);
                } else {
                    self.store.put(prefix.clone(), Node::leaf(prefix, value));
                    self.invalidate_path(node_prefix, root_path);
                }
                return;
            }
            // The current node's path is a proper prefix of the target,
            // so it is a branch. Descend, or attach the leaf directly.
            let branch = match self.store.get(&node_prefix) {
                Some(Node::Branch(branch)) => branch,
                other => panic!("expected branch at {node_prefix}, found {other:?}"),
            };
            let slot = prefix[node_prefix.len()] as usize;
            match &branch.children[slot] {
                Some(child) => {
                    let child_prefix = node_prefix.concat(&child.suffix);
                    root_path.push(node_prefix);
                    node_prefix = child_prefix;
                }
                None => {
                    self.store
                        .put(prefix.clone(), Node::leaf(prefix.clone(), value));
                    let mut branch = branch;
                    branch.put_child(prefix.suffix_from(node_prefix.len()), ZERO_HASH);
                    self.store.put(node_prefix.clone(), Node::Branch(branch));
                    self.invalidate_path(node_prefix, root_path);
                    return;
                }
            }
        }
    }

    /// Walk `path` leaf-to-root, repointing each branch's slot for the
    /// mutated subtree at the stale-hash sentinel.
    fn invalidate_path(&mut self, prefix: Nibbles, mut path: Vec<Nibbles>) {
        let mut current = prefix;
        while let Some(branch_path) = path.pop() {
            let mut branch = self.expect_branch(&branch_path);
            branch.put_child(current.suffix_from(branch_path.len()), ZERO_HASH);
            self.store
                .put(branch_path.clone(), Node::Branch(branch));
            current = branch_path;
        }
    }

    /// After deleting the leaf at `prefix`, drop its slot from the parent
    /// and roll up or remove branches that fell below two children.
    fn prune(&mut self, prefix: Nibbles, mut path: Vec<Nibbles>) {
        let mut current = prefix;
        while let Some(branch_path) = path.pop() {
            let mut branch = self.expect_branch(&branch_path);
            branch.children[current[branch_path.len()] as usize] = None;

            let remaining: Vec<_> = branch.children.iter().flatten().cloned().collect();
            if remaining.len() == 1 && !branch_path.is_empty() {
                // A single child rolls up into the grandparent; the slot
                // there now spans this branch's path plus the child's.
                self.store.del(&branch_path);
                let child_path = branch_path.concat(&remaining[0].suffix);
                self.invalidate_path(child_path, path);
                return;
            } else if !remaining.is_empty() || branch_path.is_empty() {
                self.store
                    .put(branch_path.clone(), Node::Branch(branch));
                self.invalidate_path(branch_path, path);
                return;
            }
            // No children left: the branch itself disappears and pruning
            // continues one level up.
            self.store.del(&branch_path);
            current = branch_path;
        }
    }

    /// Post-order recomputation of every stale child hash below `prefix`.
    /// Returns the node's own hash.
    fn update_hashes(&mut self, prefix: &Nibbles) -> Blake2bHash {
        let node = self
            .store
            .get(prefix)
            .unwrap_or_else(|| panic!("missing node at {prefix}"));
        let mut branch = match node {
            Node::Leaf(leaf) => return leaf.hash(),
            Node::Branch(branch) => branch,
        };
        let mut dirty = false;
        for slot in 0..16 {
            let Some(child) = branch.children[slot].as_mut() else {
                continue;
            };
            if child.hash == ZERO_HASH {
                let child_path = prefix.concat(&child.suffix);
                child.hash = self.update_hashes(&child_path);
                dirty = true;
            }
        }
        if dirty {
            self.store
                .put(prefix.clone(), Node::Branch(branch.clone()));
        }
        branch.hash()
    }

    fn expect_branch(&self, path: &Nibbles) -> Branch {
        match self.store.get(path) {
            Some(Node::Branch(branch)) => branch,
            other => panic!("expected branch at {path}, found {other:?}"),
        }
    }
}
