//! Render contexts memoized per unit of work.
//!
//! Resolving a node referenced by an asset needs a render context for the
//! reference's workspace and dimensions. Building one is expensive, so each
//! distinct `(workspace, dimensions)` pair gets exactly one context until the
//! cache is cleared, even when several tasks ask for it at the same time.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::application::repos::{
    RenderContext, RenderContextFactory, RepoError, VisibilityOverrides,
};
use crate::domain::assets::{DimensionValues, NodePropertyUsage};

const METRIC_CONTEXTS_CREATED: &str = "tagflush_render_contexts_created_total";

type ContextCell = Arc<OnceCell<Arc<dyn RenderContext>>>;

/// Stable key for a workspace and its dimension values.
///
/// Dimensions are serialized to JSON (map keys in sorted order) so equal
/// dimension sets always hash to the same key.
pub fn context_key(
    workspace_name: &str,
    dimension_values: &DimensionValues,
) -> Result<String, RepoError> {
    let dimensions = serde_json::to_string(dimension_values).map_err(|err| {
        RepoError::integrity(format!("dimension values could not be serialized: {err}"))
    })?;
    let mut hasher = Sha256::new();
    hasher.update(workspace_name.as_bytes());
    hasher.update(b"-");
    hasher.update(dimensions.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

pub struct RenderContexts {
    factory: Arc<dyn RenderContextFactory>,
    visibility: VisibilityOverrides,
    contexts: DashMap<String, ContextCell>,
}

impl RenderContexts {
    pub fn new(factory: Arc<dyn RenderContextFactory>, visibility: VisibilityOverrides) -> Self {
        Self {
            factory,
            visibility,
            contexts: DashMap::new(),
        }
    }

    /// Context for the workspace and dimensions recorded on `usage`.
    pub async fn context_for(
        &self,
        usage: &NodePropertyUsage,
    ) -> Result<Arc<dyn RenderContext>, RepoError> {
        let key = context_key(&usage.workspace_name, &usage.dimension_values)?;
        let cell = {
            let entry = self
                .contexts
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };

        let context = cell
            .get_or_try_init(|| async {
                debug!(
                    workspace = %usage.workspace_name,
                    dimensions = ?usage.dimension_values,
                    "Creating render context"
                );
                counter!(METRIC_CONTEXTS_CREATED).increment(1);
                self.factory
                    .create(
                        &usage.workspace_name,
                        &usage.dimension_values,
                        self.visibility,
                    )
                    .await
            })
            .await?;

        Ok(Arc::clone(context))
    }

    /// Number of memoized keys.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn clear(&self) {
        self.contexts.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::NodeRef;

    struct EmptyContext;

    #[async_trait]
    impl RenderContext for EmptyContext {
        async fn node_by_identifier(&self, _identifier: &str) -> Result<Option<NodeRef>, RepoError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RenderContextFactory for CountingFactory {
        async fn create(
            &self,
            _workspace_name: &str,
            _dimension_values: &DimensionValues,
            visibility: VisibilityOverrides,
        ) -> Result<Arc<dyn RenderContext>, RepoError> {
            assert!(visibility.invisible_content_shown);
            self.created.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RepoError::Timeout);
            }
            Ok(Arc::new(EmptyContext))
        }
    }

    fn usage(workspace: &str, language: &str) -> NodePropertyUsage {
        let mut dimension_values = DimensionValues::new();
        dimension_values.insert("language".to_string(), vec![language.to_string()]);
        NodePropertyUsage {
            node_identifier: "n1".to_string(),
            node_type_name: "Text".to_string(),
            workspace_name: workspace.to_string(),
            dimension_values,
        }
    }

    #[test]
    fn key_is_stable_and_distinguishes_inputs() {
        let en = usage("live", "en");
        let de = usage("live", "de");
        let key = context_key("live", &en.dimension_values).unwrap();

        assert_eq!(key, context_key("live", &en.dimension_values).unwrap());
        assert_eq!(key.len(), 64);
        assert_ne!(key, context_key("live", &de.dimension_values).unwrap());
        assert_ne!(key, context_key("user-admin", &en.dimension_values).unwrap());
    }

    #[test]
    fn key_ignores_dimension_insertion_order() {
        let mut first = DimensionValues::new();
        first.insert("language".to_string(), vec!["en".to_string()]);
        first.insert("country".to_string(), vec!["us".to_string()]);
        let mut second = DimensionValues::new();
        second.insert("country".to_string(), vec!["us".to_string()]);
        second.insert("language".to_string(), vec!["en".to_string()]);

        assert_eq!(
            context_key("live", &first).unwrap(),
            context_key("live", &second).unwrap()
        );
    }

    #[tokio::test]
    async fn identical_keys_create_one_context() {
        let factory = Arc::new(CountingFactory::default());
        let contexts = RenderContexts::new(factory.clone(), VisibilityOverrides::default());

        contexts.context_for(&usage("live", "en")).await.unwrap();
        contexts.context_for(&usage("live", "en")).await.unwrap();
        contexts.context_for(&usage("live", "de")).await.unwrap();

        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
        assert_eq!(contexts.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_construction() {
        let factory = Arc::new(CountingFactory::default());
        let contexts = Arc::new(RenderContexts::new(
            factory.clone(),
            VisibilityOverrides::default(),
        ));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let contexts = Arc::clone(&contexts);
                tokio::spawn(async move { contexts.context_for(&usage("live", "en")).await })
            })
            .collect();
        for task in tasks {
            task.await.expect("task should join").expect("context");
        }

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_construction_is_retried_on_next_request() {
        let factory = Arc::new(CountingFactory {
            fail: true,
            ..Default::default()
        });
        let contexts = RenderContexts::new(factory.clone(), VisibilityOverrides::default());

        assert!(contexts.context_for(&usage("live", "en")).await.is_err());
        assert!(contexts.context_for(&usage("live", "en")).await.is_err());
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_forgets_memoized_contexts() {
        let factory = Arc::new(CountingFactory::default());
        let contexts = RenderContexts::new(factory.clone(), VisibilityOverrides::default());

        contexts.context_for(&usage("live", "en")).await.unwrap();
        contexts.clear();
        assert!(contexts.is_empty());
        contexts.context_for(&usage("live", "en")).await.unwrap();

        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }
}
