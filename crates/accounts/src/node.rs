//! Trie node model and the byte-exact node hash inputs.

use serde::{Deserialize, Serialize};

use crate::hash::{Blake2bHash, Blake2b256};
use crate::nibbles::Nibbles;

use blake2::Digest;

/// Sentinel meaning "stale, recompute on demand". Blake2b-256 never
/// produces 32 zero bytes for the inputs hashed here, so the sentinel is
/// disjoint from every real child hash.
pub const ZERO_HASH: Blake2bHash = [0u8; 32];

/// Reference to a child node, embedded in a branch.
///
/// `suffix` is the path from the branch to the child; its first nibble
/// equals the child's slot index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub suffix: Nibbles,
    pub hash: Blake2bHash,
}

/// Branch node with 16 slots, one per next nibble.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub path: Nibbles,
    pub children: [Option<Child>; 16],
}

impl Branch {
    pub fn new(path: Nibbles) -> Self {
        Branch {
            path,
            children: Default::default(),
        }
    }

    /// Point the slot selected by the suffix's first nibble at a child.
    pub fn put_child(&mut self, suffix: Nibbles, hash: Blake2bHash) {
        let slot = suffix[0] as usize;
        self.children[slot] = Some(Child { suffix, hash });
    }

    pub fn child_count(&self) -> usize {
        self.children.iter().filter(|c| c.is_some()).count()
    }

    /// Hash input: `0x00 || u8(path len) || ascii-hex path || u8(child
    /// count) || (u8(suffix len) || ascii-hex suffix || child hash)*` in
    /// slot order.
    pub fn hash(&self) -> Blake2bHash {
        let mut h = Blake2b256::new();
        h.update([0x00, self.path.len() as u8]);
        h.update(self.path.hex_bytes());
        h.update([self.child_count() as u8]);
        for child in self.children.iter().flatten() {
            h.update([child.suffix.len() as u8]);
            h.update(child.suffix.hex_bytes());
            h.update(child.hash);
        }
        h.finalize().into()
    }
}

/// Leaf node holding a serialized account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    pub path: Nibbles,
    pub value: Vec<u8>,
}

impl Leaf {
    /// Hash input: `0xff || 0x28 || ascii-hex path || value`. The `0x28`
    /// is the fixed 40-nibble path length of a leaf.
    pub fn hash(&self) -> Blake2bHash {
        let mut h = Blake2b256::new();
        h.update([0xff, 40]);
        h.update(self.path.hex_bytes());
        h.update(&self.value);
        h.finalize().into()
    }
}

/// An entry in the state trie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Leaf(Leaf),
    Branch(Branch),
}

impl Node {
    pub fn leaf(path: Nibbles, value: Vec<u8>) -> Self {
        Node::Leaf(Leaf { path, value })
    }

    pub fn path(&self) -> &Nibbles {
        match self {
            Node::Leaf(leaf) => &leaf.path,
            Node::Branch(branch) => &branch.path,
        }
    }

    pub fn hash(&self) -> Blake2bHash {
        match self {
            Node::Leaf(leaf) => leaf.hash(),
            Node::Branch(branch) => branch.hash(),
        }
    }
}
