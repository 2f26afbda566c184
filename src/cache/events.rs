//! Change notifications delivered to the flusher.

use crate::application::repos::NodeRef;
use crate::domain::assets::AssetHandle;

/// A content change the surrounding framework signals during a unit of work.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A node was created, updated, moved or removed.
    NodeChanged(NodeRef),
    /// Only the identifier of the changed node is known.
    NodeIdentifierChanged { identifier: String },
    /// Content of a node type changed, optionally on behalf of a node.
    NodeTypeChanged {
        node_type: String,
        reference: Option<String>,
    },
    /// An asset or its resource changed.
    AssetChanged(AssetHandle),
}

impl ChangeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::NodeChanged(_) => "node",
            ChangeEvent::NodeIdentifierChanged { .. } => "node_identifier",
            ChangeEvent::NodeTypeChanged { .. } => "node_type",
            ChangeEvent::AssetChanged(_) => "asset",
        }
    }
}
