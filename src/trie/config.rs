//! Serializable inserter configuration.

/// Static settings of an [`Inserter`](super::Inserter).
///
/// With the `serde` feature this type can be loaded from any serde format:
///
/// ```rust
/// # #[cfg(feature = "serde")]
/// # {
/// use pathtrie::InserterConfig;
///
/// let config: InserterConfig = serde_json::from_str(r#"{"node_order":[7,3]}"#).unwrap();
/// assert_eq!(config.node_order, vec![7, 3]);
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct InserterConfig {
    /// Keys that, when present in a path, are consumed first and in this
    /// order, so they always sit at the top of the trie.
    pub node_order: Vec<u64>,
}

impl InserterConfig {
    /// A configuration with the given fixed node order.
    #[must_use]
    pub fn with_node_order<I>(node_order: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        Self {
            node_order: node_order.into_iter().collect(),
        }
    }
}
