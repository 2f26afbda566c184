//! In-memory adapters for every collaborator of the flusher.
//!
//! Used by the `tagflush` binary to replay fixtures and by the test suites.

mod assets;
mod content_cache;
mod content_tree;
mod node_types;

pub use assets::{AssetDefinition, InMemoryAssets, UsageDefinition};
pub use content_cache::InMemoryContentCache;
pub use content_tree::{InMemoryContentRepository, NodeDefinition};
pub use node_types::{InMemoryNodeTypes, NodeTypeDefinition};

pub(crate) const DEFAULT_WORKSPACE: &str = "live";

pub(crate) fn default_workspace() -> String {
    DEFAULT_WORKSPACE.to_string()
}
