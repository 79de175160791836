//! The trie structure and its insertion algorithm.
//!
//! Levels alternate between [`Leaf`] and [`Node`]: a leaf owns one node per
//! dimension key not yet consumed on its branch, a node owns one leaf per
//! observed value of its key. Parents own their children through `Arc`;
//! children point back through `Weak`, so dropping a branch frees it.

mod config;
mod inserter;
mod leaf;
mod node;
mod root;

pub use config::InserterConfig;
pub use inserter::{IndexNode, Inserter};
pub use leaf::Leaf;
pub use node::Node;
pub use root::Trie;
