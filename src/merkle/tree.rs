//! Binary Merkle tree with duplicate-on-odd pairing

use sha2::{Digest, Sha256};

use crate::error::{LedgerError, LedgerResult};

use super::Hash;

/// Combine two child hashes into their parent.
///
/// The children are sorted lexicographically before concatenation, so the
/// combine is commutative. Position is recovered from leaf-index parity
/// during the proof walk; if this ever becomes position-sensitive, the
/// even/odd branching in [`MerkleTree::verify_proof`] already mirrors the
/// rule generation uses.
pub fn combine(a: &Hash, b: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    if a <= b {
        hasher.update(a);
        hasher.update(b);
    } else {
        hasher.update(b);
        hasher.update(a);
    }
    hasher.finalize().into()
}

/// An in-memory Merkle tree over an ordered leaf set
///
/// Level 0 holds the leaves; each level pairs adjacent nodes, duplicating
/// the last node of an odd-length level, until a single root remains. The
/// tree is ephemeral - only the root and the leaf hashes are persisted.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree from ordered leaf hashes.
    ///
    /// A single leaf yields a depth-0 tree whose root is the leaf itself.
    ///
    /// # Errors
    /// * `LedgerError::EmptyLeafSet` - `leaves` is empty
    pub fn build(leaves: &[Hash]) -> LedgerResult<Self> {
        if leaves.is_empty() {
            return Err(LedgerError::EmptyLeafSet);
        }

        let mut levels = vec![leaves.to_vec()];

        while levels.last().map(|l| l.len()).unwrap_or(0) > 1 {
            let current = &levels[levels.len() - 1];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));

            for pair in current.chunks(2) {
                let left = &pair[0];
                // Odd-length level: the last node pairs with itself
                let right = pair.get(1).unwrap_or(left);
                next.push(combine(left, right));
            }

            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Root hash of the tree
    pub fn root(&self) -> Hash {
        // Build guarantees a non-empty top level
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Tree depth (number of levels minus one; 0 for a single leaf)
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Generate the inclusion proof for the leaf at `leaf_index`.
    ///
    /// The proof holds one sibling hash per level below the root, bottom-up;
    /// its length equals [`Self::depth`]. At each level the sibling is
    /// `index ^ 1`, clamped back to the node itself when the level's odd
    /// tail was duplicated.
    ///
    /// # Errors
    /// * `LedgerError::LeafIndexOutOfBounds` - no leaf at `leaf_index`
    pub fn proof(&self, leaf_index: usize) -> LedgerResult<Vec<Hash>> {
        if leaf_index >= self.leaf_count() {
            return Err(LedgerError::LeafIndexOutOfBounds {
                index: leaf_index,
                leaf_count: self.leaf_count(),
            });
        }

        let mut path = Vec::with_capacity(self.depth());
        let mut idx = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = (idx ^ 1).min(level.len() - 1);
            path.push(level[sibling]);
            idx /= 2;
        }

        Ok(path)
    }

    /// Verify an inclusion proof against a root.
    ///
    /// Replays [`combine`] up the path, using leaf-index parity to place the
    /// current hash on the side generation put it on.
    pub fn verify_proof(path: &[Hash], root: &Hash, leaf_hash: &Hash, leaf_index: usize) -> bool {
        let mut current = *leaf_hash;
        let mut idx = leaf_index;

        for sibling in path {
            current = if idx % 2 == 0 {
                combine(&current, sibling)
            } else {
                combine(sibling, &current)
            };
            idx /= 2;
        }

        current == *root
    }

    /// Check structural invariants after construction.
    ///
    /// Recomputes the expected level count from the leaf count and confirms
    /// the top level is exactly the root. A `false` here means a bug in tree
    /// construction, not bad input.
    pub fn validate(&self) -> bool {
        let n = self.leaf_count();
        let expected_levels = if n == 1 {
            1
        } else {
            (n as f64).log2().ceil() as usize + 1
        };

        self.levels.len() == expected_levels
            && self.levels[self.levels.len() - 1].len() == 1
            && self.levels[self.levels.len() - 1][0] == self.root()
    }
}
