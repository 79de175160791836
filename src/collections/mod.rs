//! Building blocks shared by trie nodes and leaves.
//!
//! - [`IdTree`]: persistent B-tree of ids
//! - [`ValueSet`]: the ids attached to a leaf, array first, tree under load
//! - [`ChildSet`]: copy-on-write sorted children with snapshot reads
//!
//! None of these types know about paths; the trie module composes them.

mod child_set;
mod id_tree;
mod value_set;

pub use child_set::ChildSet;
pub use child_set::Keyed;
pub use child_set::Snapshot;
pub use id_tree::IdTree;
pub use value_set::DEGREE;
pub use value_set::ValueSet;
