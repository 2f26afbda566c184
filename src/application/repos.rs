//! Repository traits describing the collaborators of the cache flusher.
//!
//! Every lookup may hit storage or the network, so the traits are async and
//! return `RepoError` on failure. Callers bound total processing time; no
//! timeout is imposed here.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::assets::{AssetHandle, AssetUsage, DimensionValues};
use crate::domain::nodes::NodeType;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("lookup timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// A unit of content as seen through a render context.
#[async_trait]
pub trait ContentNode: Send + Sync + fmt::Debug {
    fn identifier(&self) -> &str;

    fn node_type_name(&self) -> &str;

    fn depth(&self) -> usize;

    fn path(&self) -> &str;

    /// The enclosing node, or `None` when it cannot be resolved.
    async fn parent(&self) -> Result<Option<NodeRef>, RepoError>;
}

pub type NodeRef = Arc<dyn ContentNode>;

#[async_trait]
pub trait NodeTypesRepo: Send + Sync {
    /// Resolve a node type by name. Unknown names yield `RepoError::NotFound`.
    async fn node_type(&self, name: &str) -> Result<Arc<NodeType>, RepoError>;
}

/// Visibility flags handed to the render-context factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityOverrides {
    pub invisible_content_shown: bool,
    pub inaccessible_content_shown: bool,
}

impl Default for VisibilityOverrides {
    fn default() -> Self {
        Self {
            invisible_content_shown: true,
            inaccessible_content_shown: true,
        }
    }
}

#[async_trait]
pub trait RenderContext: Send + Sync {
    async fn node_by_identifier(&self, identifier: &str) -> Result<Option<NodeRef>, RepoError>;
}

#[async_trait]
pub trait RenderContextFactory: Send + Sync {
    async fn create(
        &self,
        workspace_name: &str,
        dimension_values: &DimensionValues,
        visibility: VisibilityOverrides,
    ) -> Result<Arc<dyn RenderContext>, RepoError>;
}

#[async_trait]
pub trait AssetUsageRepo: Send + Sync {
    /// Cheap check whether any usage is recorded at all.
    async fn is_in_use(&self, asset: &AssetHandle) -> Result<bool, RepoError>;

    async fn usage_references(&self, asset: &AssetHandle) -> Result<Vec<AssetUsage>, RepoError>;
}

#[async_trait]
pub trait PersistenceIdentity: Send + Sync {
    async fn identifier_of(&self, asset: &AssetHandle) -> Result<String, RepoError>;
}

/// The tag-indexed cache store that actually drops entries.
#[async_trait]
pub trait ContentCacheSink: Send + Sync {
    /// Remove every entry carrying `tag` and return how many were removed.
    /// Unknown tags remove nothing and return 0.
    async fn flush_by_tag(&self, tag: &str) -> Result<usize, RepoError>;
}
