//! Cache tag definitions.
//!
//! Rendered cache entries carry string tags; flushing a tag drops every entry
//! that carries it. `CacheTag` names the tag families the flusher derives
//! from content changes and renders them into their string form.

use std::fmt;

/// Tag carried by every cache entry.
pub const TAG_EVERYTHING: &str = "Everything";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    /// Coarsest fallback, set on every registered change.
    Everything,
    /// Entries rendering exactly this node.
    Node(String),
    /// Entries rendering content below this node.
    DescendantOf(String),
    /// Entries rendering content of this node type.
    NodeType(String),
    /// Entries referencing this asset.
    AssetDynamic(String),
}

impl CacheTag {
    pub fn node(identifier: impl Into<String>) -> Self {
        Self::Node(identifier.into())
    }

    pub fn descendant_of(identifier: impl Into<String>) -> Self {
        Self::DescendantOf(identifier.into())
    }

    pub fn node_type(name: impl Into<String>) -> Self {
        Self::NodeType(name.into())
    }

    pub fn asset_dynamic(identifier: impl Into<String>) -> Self {
        Self::AssetDynamic(identifier.into())
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTag::Everything => f.write_str(TAG_EVERYTHING),
            CacheTag::Node(identifier) => write!(f, "Node_{identifier}"),
            CacheTag::DescendantOf(identifier) => write!(f, "DescendantOf_{identifier}"),
            CacheTag::NodeType(name) => write!(f, "NodeType_{name}"),
            CacheTag::AssetDynamic(identifier) => write!(f, "AssetDynamicTag_{identifier}"),
        }
    }
}

impl From<CacheTag> for String {
    fn from(tag: CacheTag) -> Self {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_render_with_family_prefix() {
        assert_eq!(CacheTag::Everything.to_string(), "Everything");
        assert_eq!(CacheTag::node("n1").to_string(), "Node_n1");
        assert_eq!(CacheTag::descendant_of("n0").to_string(), "DescendantOf_n0");
        assert_eq!(
            CacheTag::node_type("Acme:Text").to_string(),
            "NodeType_Acme:Text"
        );
        assert_eq!(
            CacheTag::asset_dynamic("a-1").to_string(),
            "AssetDynamicTag_a-1"
        );
    }

    #[test]
    fn tag_equality_follows_family_and_value() {
        assert_eq!(CacheTag::node("x"), CacheTag::node("x"));
        assert_ne!(CacheTag::node("x"), CacheTag::descendant_of("x"));
    }
}
