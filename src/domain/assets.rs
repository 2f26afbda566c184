//! Assets and the references that tie them to content nodes.

use std::collections::BTreeMap;
use std::fmt;

/// Content dimension values (for example `language => ["en_US", "en"]`).
///
/// Kept in a `BTreeMap` so that serializing it always yields the same bytes
/// for the same dimensions.
pub type DimensionValues = BTreeMap<String, Vec<String>>;

/// Opaque handle to an asset as the media layer knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetHandle(String);

impl AssetHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an asset is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetUsage {
    /// The asset is referenced from a property of a content node.
    NodeProperties(NodePropertyUsage),
    /// A reference kind the cache layer does not act on.
    Other { kind: String },
}

impl AssetUsage {
    pub fn kind(&self) -> &str {
        match self {
            AssetUsage::NodeProperties(_) => "node_properties",
            AssetUsage::Other { kind } => kind,
        }
    }
}

/// A node property that embeds or references an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePropertyUsage {
    pub node_identifier: String,
    pub node_type_name: String,
    pub workspace_name: String,
    pub dimension_values: DimensionValues,
}
