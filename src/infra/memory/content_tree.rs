//! Workspace-scoped content tree with render contexts.
//!
//! Nodes are addressed by identifier within a workspace and hang below the
//! node whose path encloses theirs. A render context sees the nodes of one
//! workspace that match its dimensions; hidden nodes only show up when the
//! context was created with `invisible_content_shown`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::repos::{
    ContentNode, NodeRef, RenderContext, RenderContextFactory, RepoError, VisibilityOverrides,
};
use crate::domain::assets::DimensionValues;
use crate::domain::error::DomainError;
use crate::domain::nodes::NodePath;

use super::default_workspace;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDefinition {
    pub identifier: String,
    pub node_type: String,
    pub path: String,
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default)]
    pub dimensions: DimensionValues,
    #[serde(default)]
    pub hidden: bool,
    /// Only reachable through contexts that show inaccessible content.
    #[serde(default)]
    pub restricted: bool,
}

impl NodeDefinition {
    pub fn new(
        identifier: impl Into<String>,
        node_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            node_type: node_type.into(),
            path: path.into(),
            workspace: default_workspace(),
            dimensions: DimensionValues::new(),
            hidden: false,
            restricted: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn in_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = workspace.into();
        self
    }
}

#[derive(Debug)]
struct StoredNode {
    identifier: String,
    node_type: String,
    path: NodePath,
    dimensions: DimensionValues,
    hidden: bool,
    restricted: bool,
}

#[derive(Debug, Default)]
struct WorkspaceNodes {
    by_identifier: HashMap<String, Arc<StoredNode>>,
    by_path: HashMap<NodePath, Arc<StoredNode>>,
}

#[derive(Debug, Default)]
struct Tree {
    workspaces: HashMap<String, WorkspaceNodes>,
}

#[derive(Debug, Clone, Copy)]
struct View<'a> {
    dimensions: Option<&'a DimensionValues>,
    visibility: VisibilityOverrides,
}

impl View<'_> {
    fn admits(&self, node: &StoredNode) -> bool {
        if node.hidden && !self.visibility.invisible_content_shown {
            return false;
        }
        if node.restricted && !self.visibility.inaccessible_content_shown {
            return false;
        }
        let Some(dimensions) = self.dimensions else {
            return true;
        };
        node.dimensions.iter().all(|(name, values)| {
            dimensions
                .get(name)
                .is_some_and(|wanted| values.iter().any(|value| wanted.contains(value)))
        })
    }
}

/// Read-only content tree built from node definitions.
#[derive(Debug)]
pub struct InMemoryContentRepository {
    tree: Arc<Tree>,
    contexts_created: AtomicUsize,
}

impl InMemoryContentRepository {
    pub fn from_definitions(definitions: &[NodeDefinition]) -> Result<Self, DomainError> {
        let mut tree = Tree::default();
        for definition in definitions {
            let path = NodePath::parse(&definition.path)?;
            let workspace = tree
                .workspaces
                .entry(definition.workspace.clone())
                .or_default();
            if workspace.by_identifier.contains_key(&definition.identifier) {
                return Err(DomainError::validation(format!(
                    "node `{}` is defined twice in workspace `{}`",
                    definition.identifier, definition.workspace
                )));
            }
            if workspace.by_path.contains_key(&path) {
                return Err(DomainError::validation(format!(
                    "path `{path}` is taken twice in workspace `{}`",
                    definition.workspace
                )));
            }
            let node = Arc::new(StoredNode {
                identifier: definition.identifier.clone(),
                node_type: definition.node_type.clone(),
                path: path.clone(),
                dimensions: definition.dimensions.clone(),
                hidden: definition.hidden,
                restricted: definition.restricted,
            });
            workspace
                .by_identifier
                .insert(definition.identifier.clone(), Arc::clone(&node));
            workspace.by_path.insert(path, node);
        }

        Ok(Self {
            tree: Arc::new(tree),
            contexts_created: AtomicUsize::new(0),
        })
    }

    /// Look a node up regardless of visibility and dimensions.
    pub fn node(&self, workspace: &str, identifier: &str) -> Option<NodeRef> {
        let stored = self
            .tree
            .workspaces
            .get(workspace)?
            .by_identifier
            .get(identifier)?;
        Some(TreeNode::new(
            &self.tree,
            workspace,
            stored,
            None,
            VisibilityOverrides::default(),
        ))
    }

    /// How many render contexts this repository has built.
    pub fn contexts_created(&self) -> usize {
        self.contexts_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderContextFactory for InMemoryContentRepository {
    async fn create(
        &self,
        workspace_name: &str,
        dimension_values: &DimensionValues,
        visibility: VisibilityOverrides,
    ) -> Result<Arc<dyn RenderContext>, RepoError> {
        self.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TreeContext {
            tree: Arc::clone(&self.tree),
            workspace: workspace_name.to_string(),
            dimensions: Arc::new(dimension_values.clone()),
            visibility,
        }))
    }
}

struct TreeContext {
    tree: Arc<Tree>,
    workspace: String,
    dimensions: Arc<DimensionValues>,
    visibility: VisibilityOverrides,
}

#[async_trait]
impl RenderContext for TreeContext {
    async fn node_by_identifier(&self, identifier: &str) -> Result<Option<NodeRef>, RepoError> {
        let view = View {
            dimensions: Some(&*self.dimensions),
            visibility: self.visibility,
        };
        let node = self
            .tree
            .workspaces
            .get(&self.workspace)
            .and_then(|workspace| workspace.by_identifier.get(identifier))
            .filter(|stored| view.admits(stored))
            .map(|stored| {
                TreeNode::new(
                    &self.tree,
                    &self.workspace,
                    stored,
                    Some(Arc::clone(&self.dimensions)),
                    self.visibility,
                )
            });
        Ok(node)
    }
}

#[derive(Debug)]
struct TreeNode {
    tree: Arc<Tree>,
    workspace: String,
    stored: Arc<StoredNode>,
    dimensions: Option<Arc<DimensionValues>>,
    visibility: VisibilityOverrides,
}

impl TreeNode {
    fn new(
        tree: &Arc<Tree>,
        workspace: &str,
        stored: &Arc<StoredNode>,
        dimensions: Option<Arc<DimensionValues>>,
        visibility: VisibilityOverrides,
    ) -> NodeRef {
        Arc::new(Self {
            tree: Arc::clone(tree),
            workspace: workspace.to_string(),
            stored: Arc::clone(stored),
            dimensions,
            visibility,
        })
    }
}

#[async_trait]
impl ContentNode for TreeNode {
    fn identifier(&self) -> &str {
        &self.stored.identifier
    }

    fn node_type_name(&self) -> &str {
        &self.stored.node_type
    }

    fn depth(&self) -> usize {
        self.stored.path.depth()
    }

    fn path(&self) -> &str {
        self.stored.path.as_str()
    }

    async fn parent(&self) -> Result<Option<NodeRef>, RepoError> {
        let Some(parent_path) = self.stored.path.parent() else {
            return Ok(None);
        };
        let view = View {
            dimensions: self.dimensions.as_deref(),
            visibility: self.visibility,
        };
        let parent = self
            .tree
            .workspaces
            .get(&self.workspace)
            .and_then(|workspace| workspace.by_path.get(&parent_path))
            .filter(|stored| view.admits(stored))
            .map(|stored| {
                TreeNode::new(
                    &self.tree,
                    &self.workspace,
                    stored,
                    self.dimensions.clone(),
                    self.visibility,
                )
            });
        Ok(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> InMemoryContentRepository {
        InMemoryContentRepository::from_definitions(&[
            NodeDefinition::new("root", "Site", "/a"),
            NodeDefinition::new("n0", "Page", "/a/b"),
            NodeDefinition::new("n1", "Text", "/a/b/n1"),
            NodeDefinition::new("secret", "Text", "/a/b/secret").hidden(),
            NodeDefinition::new("orphan", "Text", "/x/y/orphan"),
            NodeDefinition::new("members", "Page", "/a/members").restricted(),
        ])
        .expect("valid tree")
    }

    #[tokio::test]
    async fn parent_follows_enclosing_path() {
        let repo = repository();
        let n1 = repo.node("live", "n1").expect("n1 exists");
        assert_eq!(n1.depth(), 3);

        let n0 = n1.parent().await.unwrap().expect("n0 is the parent");
        assert_eq!(n0.identifier(), "n0");
        let root = n0.parent().await.unwrap().expect("root is the grandparent");
        assert_eq!(root.identifier(), "root");
        assert_eq!(root.depth(), 1);
    }

    #[tokio::test]
    async fn missing_parent_yields_none() {
        let repo = repository();
        let orphan = repo.node("live", "orphan").expect("orphan exists");
        assert!(orphan.parent().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn hidden_nodes_depend_on_visibility() {
        let repo = repository();
        let dimensions = DimensionValues::new();

        let shown = repo
            .create("live", &dimensions, VisibilityOverrides::default())
            .await
            .unwrap();
        assert!(shown.node_by_identifier("secret").await.unwrap().is_some());

        let hidden = repo
            .create(
                "live",
                &dimensions,
                VisibilityOverrides {
                    invisible_content_shown: false,
                    inaccessible_content_shown: true,
                },
            )
            .await
            .unwrap();
        assert!(hidden.node_by_identifier("secret").await.unwrap().is_none());
        assert_eq!(repo.contexts_created(), 2);
    }

    #[tokio::test]
    async fn restricted_nodes_depend_on_visibility() {
        let repo = repository();
        let dimensions = DimensionValues::new();

        let shown = repo
            .create("live", &dimensions, VisibilityOverrides::default())
            .await
            .unwrap();
        assert!(shown.node_by_identifier("members").await.unwrap().is_some());

        let restricted = repo
            .create(
                "live",
                &dimensions,
                VisibilityOverrides {
                    invisible_content_shown: true,
                    inaccessible_content_shown: false,
                },
            )
            .await
            .unwrap();
        assert!(restricted.node_by_identifier("members").await.unwrap().is_none());
        assert!(restricted.node_by_identifier("secret").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn contexts_filter_by_workspace_and_dimensions() {
        let mut german = NodeDefinition::new("de-text", "Text", "/a/de").in_workspace("user-admin");
        german
            .dimensions
            .insert("language".to_string(), vec!["de".to_string()]);
        let repo = InMemoryContentRepository::from_definitions(&[german]).expect("valid tree");

        let mut de = DimensionValues::new();
        de.insert("language".to_string(), vec!["de".to_string()]);
        let mut en = DimensionValues::new();
        en.insert("language".to_string(), vec!["en".to_string()]);
        let visibility = VisibilityOverrides::default();

        let admin_de = repo.create("user-admin", &de, visibility).await.unwrap();
        let admin_en = repo.create("user-admin", &en, visibility).await.unwrap();
        let live_de = repo.create("live", &de, visibility).await.unwrap();

        assert!(admin_de.node_by_identifier("de-text").await.unwrap().is_some());
        assert!(admin_en.node_by_identifier("de-text").await.unwrap().is_none());
        assert!(live_de.node_by_identifier("de-text").await.unwrap().is_none());
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        let err = InMemoryContentRepository::from_definitions(&[
            NodeDefinition::new("n1", "Text", "/a"),
            NodeDefinition::new("n1", "Text", "/b"),
        ])
        .expect_err("duplicate identifier");
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
