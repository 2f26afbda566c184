//! Content cache flusher.
//!
//! Collects the cache tags affected by content changes during one unit of
//! work and flushes each of them once when the unit of work commits.
//!
//! State machine: empty, accumulating (any number of `register_*` calls in
//! any order, possibly from several tasks), flushing (`commit`), empty again.
//! `commit` must only run once every registration of the unit of work has
//! finished; that barrier belongs to the caller.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, trace, warn};

use crate::application::repos::{
    AssetUsageRepo, ContentCacheSink, ContentNode, NodeRef, NodeTypesRepo, PersistenceIdentity,
    RenderContextFactory, RepoError,
};
use crate::domain::assets::{AssetHandle, AssetUsage};

use super::config::FlusherConfig;
use super::contexts::RenderContexts;
use super::events::ChangeEvent;
use super::pending::{PendingInvalidations, PendingTag};
use super::supertypes::implemented_type_names;
use super::tags::{CacheTag, TAG_EVERYTHING};

const METRIC_TAGS_FLUSHED: &str = "tagflush_tags_flushed_total";
const METRIC_ENTRIES_REMOVED: &str = "tagflush_entries_removed_total";
const METRIC_FLUSH_FAILURES: &str = "tagflush_flush_failures_total";
const METRIC_COMMIT_MS: &str = "tagflush_commit_ms";

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("node type `{name}` not found")]
    NodeTypeNotFound { name: String },
    #[error(transparent)]
    Lookup(#[from] RepoError),
}

/// Outcome of one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    /// Tags handed to the cache sink.
    pub tags_flushed: usize,
    /// Entries the sink reported as removed.
    pub entries_removed: usize,
    /// Tags whose flush failed. They are not retried.
    pub failed_tags: Vec<String>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failed_tags.is_empty()
    }
}

/// External services the flusher consults.
#[derive(Clone)]
pub struct FlusherCollaborators {
    pub sink: Arc<dyn ContentCacheSink>,
    pub node_types: Arc<dyn NodeTypesRepo>,
    pub assets: Arc<dyn AssetUsageRepo>,
    pub identity: Arc<dyn PersistenceIdentity>,
    pub contexts: Arc<dyn RenderContextFactory>,
}

pub struct ContentCacheFlusher {
    config: FlusherConfig,
    sink: Arc<dyn ContentCacheSink>,
    node_types: Arc<dyn NodeTypesRepo>,
    assets: Arc<dyn AssetUsageRepo>,
    identity: Arc<dyn PersistenceIdentity>,
    contexts: RenderContexts,
    pending: PendingInvalidations,
}

impl ContentCacheFlusher {
    pub fn new(config: FlusherConfig, collaborators: FlusherCollaborators) -> Self {
        let contexts = RenderContexts::new(collaborators.contexts, config.visibility());
        Self {
            config,
            sink: collaborators.sink,
            node_types: collaborators.node_types,
            assets: collaborators.assets,
            identity: collaborators.identity,
            contexts,
            pending: PendingInvalidations::new(),
        }
    }

    pub fn config(&self) -> &FlusherConfig {
        &self.config
    }

    /// Dispatch a change notification to the matching registration.
    pub async fn handle(&self, event: &ChangeEvent) -> Result<(), FlushError> {
        trace!(event_kind = event.kind(), "Change event received");
        match event {
            ChangeEvent::NodeChanged(node) => self.register_node_change(node.as_ref()).await,
            ChangeEvent::NodeIdentifierChanged { identifier } => {
                self.register_change_on_node_identifier(identifier);
                Ok(())
            }
            ChangeEvent::NodeTypeChanged {
                node_type,
                reference,
            } => {
                self.register_change_on_node_type(node_type, reference.as_deref())
                    .await
            }
            ChangeEvent::AssetChanged(asset) => self.register_asset_change(asset).await,
        }
    }

    /// Register a changed node: its type closure, its identity, and each
    /// ancestor deeper than depth 1.
    #[instrument(skip_all, fields(node = %node.identifier()))]
    pub async fn register_node_change(&self, node: &dyn ContentNode) -> Result<(), FlushError> {
        if !self.accepting() {
            return Ok(());
        }

        self.mark_everything();
        self.register_change_on_node_type(node.node_type_name(), Some(node.identifier()))
            .await?;
        self.register_change_on_node_identifier(node.identifier());

        let original_path = node.path();
        let mut depth = node.depth();
        let mut current: Option<NodeRef> = None;
        while depth > 1 {
            let parent = match current.as_ref() {
                Some(ancestor) => ancestor.parent().await?,
                None => node.parent().await?,
            };
            let Some(ancestor) = parent else {
                // The tree can hold nodes whose parent is gone; keep what we have.
                debug!(path = original_path, depth, "Ancestor chain truncated");
                break;
            };
            let ancestor_depth = ancestor.depth();
            if ancestor_depth >= depth {
                warn!(
                    path = original_path,
                    ancestor = %ancestor.identifier(),
                    depth,
                    ancestor_depth,
                    "Ancestor is not above its child; walk stopped"
                );
                break;
            }
            depth = ancestor_depth;
            if depth <= 1 {
                break;
            }

            let tag = CacheTag::descendant_of(ancestor.identifier());
            let reason = format!(
                "which were tagged with \"{tag}\" because node \"{original_path}\" has changed."
            );
            self.pending.mark(tag, reason);
            current = Some(ancestor);
        }

        Ok(())
    }

    /// Register a change known only by node identifier.
    ///
    /// Without a node there is no way to walk up the tree, so only the node
    /// itself and entries below it are tagged.
    pub fn register_change_on_node_identifier(&self, identifier: &str) {
        if !self.accepting() {
            return;
        }

        self.mark_everything();

        let node_tag = CacheTag::node(identifier);
        let reason =
            format!("which were tagged with \"{node_tag}\" because that identifier has changed.");
        self.pending.mark(node_tag, reason);

        let descendant_tag = CacheTag::descendant_of(identifier);
        let reason = format!(
            "which were tagged with \"{descendant_tag}\" because node \"{identifier}\" has changed."
        );
        self.pending.mark(descendant_tag, reason);
    }

    /// Register a change on a node type and every type it inherits from.
    pub async fn register_change_on_node_type(
        &self,
        node_type_name: &str,
        reference_identifier: Option<&str>,
    ) -> Result<(), FlushError> {
        if !self.accepting() {
            return Ok(());
        }

        self.mark_everything();

        let node_type = self
            .node_types
            .node_type(node_type_name)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => FlushError::NodeTypeNotFound {
                    name: node_type_name.to_string(),
                },
                other => FlushError::Lookup(other),
            })?;

        let reference = reference_identifier.unwrap_or_default();
        for implemented in implemented_type_names(&node_type) {
            let tag = CacheTag::node_type(implemented);
            let reason = format!(
                "which were tagged with \"{tag}\" because node \"{reference}\" has changed and was of type \"{node_type_name}\"."
            );
            self.pending.mark(tag, reason);
        }

        Ok(())
    }

    /// Register every node that references `asset` from its properties.
    #[instrument(skip_all, fields(asset = %asset))]
    pub async fn register_asset_change(&self, asset: &AssetHandle) -> Result<(), FlushError> {
        if !self.accepting() {
            return Ok(());
        }
        if !self.assets.is_in_use(asset).await? {
            trace!("Asset not in use");
            return Ok(());
        }

        let mut asset_identifier: Option<String> = None;
        for usage in self.assets.usage_references(asset).await? {
            let reference = match usage {
                AssetUsage::NodeProperties(reference) => reference,
                other => {
                    trace!(usage_kind = other.kind(), "Skipping asset usage");
                    continue;
                }
            };

            let context = self.contexts.context_for(&reference).await?;
            match context
                .node_by_identifier(&reference.node_identifier)
                .await?
            {
                Some(node) => self.register_node_change(node.as_ref()).await?,
                None => debug!(
                    node = %reference.node_identifier,
                    workspace = %reference.workspace_name,
                    "Node referencing asset not found in its context"
                ),
            }

            self.register_change_on_node_type(
                &reference.node_type_name,
                Some(&reference.node_identifier),
            )
            .await?;

            let identifier = match asset_identifier.as_ref() {
                Some(identifier) => identifier.clone(),
                None => {
                    let identifier = self.identity.identifier_of(asset).await?;
                    asset_identifier = Some(identifier.clone());
                    identifier
                }
            };
            let tag = CacheTag::asset_dynamic(&identifier);
            let reason = format!(
                "which were tagged with \"{tag}\" because asset \"{identifier}\" has changed."
            );
            self.pending.mark(tag, reason);
        }

        Ok(())
    }

    #[deprecated(note = "use `register_asset_change`")]
    pub async fn register_asset_resource_change(
        &self,
        asset: &AssetHandle,
    ) -> Result<(), FlushError> {
        self.register_asset_change(asset).await
    }

    /// Flush every pending tag once and reset the unit of work.
    ///
    /// A failing tag is logged and reported but does not stop the remaining
    /// flushes, and it is not kept for another attempt.
    #[instrument(skip(self))]
    pub async fn commit(&self) -> CommitReport {
        let started_at = Instant::now();
        let pending = self.pending.drain();
        self.contexts.clear();

        let mut report = CommitReport::default();
        if pending.is_empty() {
            return report;
        }

        for PendingTag { tag, reason } in pending {
            report.tags_flushed += 1;
            counter!(METRIC_TAGS_FLUSHED).increment(1);
            match self.sink.flush_by_tag(&tag).await {
                Ok(0) => {}
                Ok(affected) => {
                    report.entries_removed += affected;
                    counter!(METRIC_ENTRIES_REMOVED).increment(affected as u64);
                    debug!(
                        tag = %tag,
                        affected,
                        "Content cache: removed {affected} entries {reason}"
                    );
                }
                Err(err) => {
                    counter!(METRIC_FLUSH_FAILURES).increment(1);
                    warn!(tag = %tag, error = %err, "Content cache flush failed");
                    report.failed_tags.push(tag);
                }
            }
        }

        info!(
            tags = report.tags_flushed,
            removed = report.entries_removed,
            failed = report.failed_tags.len(),
            "Content cache flush complete"
        );
        histogram!(METRIC_COMMIT_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        report
    }

    /// Sorted view of the tags waiting for the next commit.
    pub fn pending_tags(&self) -> Vec<PendingTag> {
        self.pending.snapshot()
    }

    pub fn is_pending(&self, tag: &CacheTag) -> bool {
        self.pending.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn accepting(&self) -> bool {
        if !self.config.enabled {
            debug!("Content cache flusher disabled; change ignored");
        }
        self.config.enabled
    }

    fn mark_everything(&self) {
        self.pending.mark(
            CacheTag::Everything,
            format!("which were tagged with \"{TAG_EVERYTHING}\"."),
        );
    }
}
