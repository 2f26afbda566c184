//! Node types and node paths.
//!
//! A node type is a named schema that may inherit from several declared
//! supertypes, so the hierarchy forms a DAG. Supertypes are shared through
//! `Arc` so a diamond (`C: B1 + B2`, both `B1` and `B2` extending `A`) holds a
//! single `A`.

use std::fmt;
use std::sync::Arc;

use super::error::DomainError;

/// A named node schema with its declared direct supertypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeType {
    name: String,
    declared_supertypes: Vec<Arc<NodeType>>,
}

impl NodeType {
    pub fn new(name: impl Into<String>, declared_supertypes: Vec<Arc<NodeType>>) -> Self {
        Self {
            name: name.into(),
            declared_supertypes,
        }
    }

    /// A node type without supertypes.
    pub fn root(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_supertypes(&self) -> &[Arc<NodeType>] {
        &self.declared_supertypes
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Absolute, slash-separated position of a node in the content tree.
///
/// The depth of a node equals its number of path segments: `/sites` has
/// depth 1, `/sites/home` depth 2. The bare root `/` has depth 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(String);

impl NodePath {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('/') {
            return Err(DomainError::validation(format!(
                "node path `{raw}` must be absolute"
            )));
        }
        if trimmed.len() > 1 && trimmed.ends_with('/') {
            return Err(DomainError::validation(format!(
                "node path `{raw}` must not end with a slash"
            )));
        }
        if trimmed.split('/').skip(1).any(str::is_empty) && trimmed != "/" {
            return Err(DomainError::validation(format!(
                "node path `{raw}` contains an empty segment"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn depth(&self) -> usize {
        if self.0 == "/" {
            return 0;
        }
        self.0.split('/').skip(1).count()
    }

    /// The enclosing path, or `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(NodePath("/".to_string())),
            Some(index) => Some(NodePath(self.0[..index].to_string())),
            None => None,
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
