//! Deterministic Merkle commitment over an ordered leaf set
//!
//! Pure and stateless: nothing here touches storage or the network. The
//! builder computes one ephemeral tree per batch and persists only its root
//! plus the per-member leaf hashes.

mod leaf;
mod tree;

pub use leaf::leaf_hash;
pub use tree::{combine, MerkleTree};

/// All hashes in the system are SHA-256 digests
pub type Hash = [u8; 32];
