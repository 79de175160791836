//! Error types for trie mutations.
//!
//! Lookups never fail: absence is reported through `Option` or `bool`.
//! Broken structural invariants are programming errors and panic. The only
//! recoverable failure is running out of memory while a leaf's value set is
//! promoted from its array to its tree representation.

use std::collections::TryReserveError;
use std::fmt;

/// Errors returned by mutating trie operations.
///
/// # Examples
///
/// ```rust
/// use pathtrie::TrieError;
///
/// let source = Vec::<u64>::new().try_reserve(usize::MAX).unwrap_err();
/// let error = TrieError::CapacityExhausted { requested: 128, source };
/// assert!(error.to_string().starts_with("value set promotion failed"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieError {
    /// Building the tree representation of a value set ran out of memory.
    ///
    /// The value set is left in its previous (array) representation and the
    /// pending insertion is not applied.
    CapacityExhausted {
        /// Number of ids the tree had to hold.
        requested: usize,
        /// The underlying allocation failure.
        source: TryReserveError,
    },
}

impl fmt::Display for TrieError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExhausted { requested, source } => write!(
                formatter,
                "value set promotion failed while copying {requested} ids: {source}"
            ),
        }
    }
}

impl std::error::Error for TrieError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CapacityExhausted { source, .. } => Some(source),
        }
    }
}
