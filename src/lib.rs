//! # pathtrie
//!
//! A concurrent in-memory index from multi-key paths to sets of integer ids.
//!
//! ## Overview
//!
//! A [`Path`] is an unordered set of `(key, value)` pairs such as
//! `{color = 3, size = 7}`. Ids are attached to paths; all ids stored under
//! exactly that combination end up in one [`Leaf`]. Internally the trie
//! alternates between:
//!
//! - **[`Leaf`]**: the point reached by the pairs consumed so far. Holds the
//!   attached ids and one [`Node`] per key still to be consumed.
//! - **[`Node`]**: one dimension key. Holds one [`Leaf`] per observed value.
//!
//! The [`Inserter`] decides which key to consume at each level. It prefers
//! existing structure, so a path reuses any branch whose keys it contains,
//! and builds missing suffixes off to the side before attaching them in one
//! step.
//!
//! ## Concurrency
//!
//! There is no global lock. Each leaf guards its ids with its own
//! reader/writer lock and every child collection is copy-on-write, so
//! readers iterate consistent snapshots while writers keep going.
//!
//! ## Feature Flags
//!
//! - `debug` (default): Graphviz export and footprint estimation
//! - `serde`: `Serialize`/`Deserialize` for [`Path`], [`Pair`] and
//!   [`InserterConfig`]
//! - `tracing`: structured logs of chain construction, races, promotions
//!   and pruning
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use pathtrie::prelude::*;
//!
//! let trie = Trie::new();
//! trie.insert(&Path::from([(1, 3), (2, 7)]), 100).unwrap();
//! trie.insert(&Path::from([(2, 7), (1, 3)]), 101).unwrap();
//!
//! let leaf = trie.find_leaf(&Path::from([(1, 3), (2, 7)])).unwrap();
//! let mut ids = Vec::new();
//! leaf.append_to(&mut ids);
//! assert_eq!(ids, vec![100, 101]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// ```rust
/// use pathtrie::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::TrieError;
    pub use crate::path::{Pair, Path};
    pub use crate::trie::{Inserter, InserterConfig, Leaf, Node, Trie};
}

mod tracing_helpers;

pub mod collections;
pub mod error;
pub mod path;
pub mod trie;

#[cfg(feature = "debug")]
pub mod debug;

pub use error::TrieError;
pub use path::{Cursor, Keys, Pair, Path};
pub use trie::{IndexNode, Inserter, InserterConfig, Leaf, Node, Trie};

static_assertions::assert_impl_all!(Trie: Send, Sync);
static_assertions::assert_impl_all!(Leaf: Send, Sync);
static_assertions::assert_impl_all!(Node: Send, Sync);
static_assertions::assert_impl_all!(Inserter: Send, Sync, Clone);
