//! Configuration-tree values.
//!
//! The array exposes its configuration and state as a tree of slash-delimited
//! node paths (e.g. `/vshare/config/iscsi/enable`). A query returns the subset
//! of requested nodes that exist; absent nodes are simply not in the result.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Scalar value held by a configuration node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeValue {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Text(String),
}

impl NodeValue {
    /// String view, only for text nodes.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view. The gateways report flags either as native booleans or
    /// as `"true"`/`"false"` text depending on the node type.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NodeValue::Bool(b) => Some(*b),
            NodeValue::UInt(n) => Some(*n != 0),
            NodeValue::Int(n) => Some(*n != 0),
            NodeValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
        }
    }

    /// Unsigned integer view, parsing text nodes.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            NodeValue::UInt(n) => Some(*n),
            NodeValue::Int(n) => u64::try_from(*n).ok(),
            NodeValue::Text(s) => s.trim().parse().ok(),
            NodeValue::Bool(_) => None,
        }
    }
}

impl Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeValue::Bool(b) => write!(f, "{}", b),
            NodeValue::UInt(n) => write!(f, "{}", n),
            NodeValue::Int(n) => write!(f, "{}", n),
            NodeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for NodeValue {
    fn from(value: bool) -> Self {
        NodeValue::Bool(value)
    }
}

impl From<u64> for NodeValue {
    fn from(value: u64) -> Self {
        NodeValue::UInt(value)
    }
}

impl From<i64> for NodeValue {
    fn from(value: i64) -> Self {
        NodeValue::Int(value)
    }
}

impl From<&str> for NodeValue {
    fn from(value: &str) -> Self {
        NodeValue::Text(value.to_string())
    }
}

impl From<String> for NodeValue {
    fn from(value: String) -> Self {
        NodeValue::Text(value)
    }
}

/// Result of a configuration-tree query: path to value, absent paths omitted.
///
/// Ordered by path so that wildcard results iterate deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeValues(BTreeMap<String, NodeValue>);

impl NodeValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, path: impl Into<String>, value: impl Into<NodeValue>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<NodeValue>) {
        self.0.insert(path.into(), value.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<NodeValue> {
        self.0.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&NodeValue> {
        self.0.get(path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(NodeValue::as_str)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(NodeValue::as_bool)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(NodeValue::as_u64)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeValue)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &NodeValue> {
        self.0.values()
    }

    /// Nodes matching any of the requested paths (wildcards included).
    pub fn select(&self, requested: &[String]) -> NodeValues {
        self.0
            .iter()
            .filter(|(path, _)| requested.iter().any(|pattern| path_matches(pattern, path)))
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<NodeValue>> FromIterator<(K, V)> for NodeValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(path, value)| (path.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for NodeValues {
    type Item = (String, NodeValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, NodeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Check whether `path` is selected by a query `pattern`.
///
/// A pattern ending in `/*` selects the direct children of its parent node;
/// any other pattern must match exactly.
pub fn path_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) if prefix.ends_with('/') => path
            .strip_prefix(prefix)
            .is_some_and(|child| !child.is_empty() && !child.contains('/')),
        _ => pattern == path,
    }
}
