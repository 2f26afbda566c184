//! TOML fixtures describing a content repository, a populated cache and a
//! sequence of changes to replay against the flusher.

use std::{num::NonZeroUsize, path::Path, sync::Arc};

use serde::Deserialize;

use crate::{
    cache::{ChangeEvent, FlusherCollaborators},
    domain::assets::AssetHandle,
    infra::{
        error::InfraError,
        memory::{
            AssetDefinition, InMemoryAssets, InMemoryContentCache, InMemoryContentRepository,
            InMemoryNodeTypes, NodeDefinition, NodeTypeDefinition, default_workspace,
        },
    },
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub node_types: Vec<NodeTypeDefinition>,
    pub nodes: Vec<NodeDefinition>,
    pub assets: Vec<AssetDefinition>,
    pub cache_entries: Vec<CacheEntryDefinition>,
    pub changes: Vec<ChangeDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheEntryDefinition {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeDefinition {
    Node {
        node: String,
        #[serde(default = "default_workspace")]
        workspace: String,
    },
    NodeIdentifier {
        identifier: String,
    },
    NodeType {
        node_type: String,
        #[serde(default)]
        reference: Option<String>,
    },
    Asset {
        asset: String,
    },
}

/// Collaborators built from a fixture, plus the changes it describes.
pub struct FixtureWorld {
    pub cache: Arc<InMemoryContentCache>,
    pub node_types: Arc<InMemoryNodeTypes>,
    pub content: Arc<InMemoryContentRepository>,
    pub assets: Arc<InMemoryAssets>,
    pub changes: Vec<ChangeEvent>,
}

impl Fixture {
    pub fn parse(data: &str) -> Result<Self, InfraError> {
        toml::from_str(data).map_err(|err| InfraError::fixture(format!("invalid fixture: {err}")))
    }

    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let data = tokio::fs::read_to_string(path).await?;
        Self::parse(&data)
    }

    pub fn build(&self, capacity: NonZeroUsize) -> Result<FixtureWorld, InfraError> {
        let node_types = Arc::new(InMemoryNodeTypes::from_definitions(&self.node_types)?);
        let content = Arc::new(InMemoryContentRepository::from_definitions(&self.nodes)?);
        let assets = Arc::new(InMemoryAssets::from_definitions(&self.assets)?);

        let cache = Arc::new(InMemoryContentCache::new(capacity));
        for entry in &self.cache_entries {
            cache.set(entry.id.clone(), entry.body.clone(), entry.tags.iter().cloned());
        }

        let changes = self
            .changes
            .iter()
            .map(|change| resolve_change(change, &content))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FixtureWorld {
            cache,
            node_types,
            content,
            assets,
            changes,
        })
    }
}

impl FixtureWorld {
    pub fn collaborators(&self) -> FlusherCollaborators {
        FlusherCollaborators {
            sink: self.cache.clone(),
            node_types: self.node_types.clone(),
            assets: self.assets.clone(),
            identity: self.assets.clone(),
            contexts: self.content.clone(),
        }
    }
}

fn resolve_change(
    change: &ChangeDefinition,
    content: &InMemoryContentRepository,
) -> Result<ChangeEvent, InfraError> {
    let event = match change {
        ChangeDefinition::Node { node, workspace } => {
            let resolved = content.node(workspace, node).ok_or_else(|| {
                InfraError::fixture(format!(
                    "change refers to unknown node `{node}` in workspace `{workspace}`"
                ))
            })?;
            ChangeEvent::NodeChanged(resolved)
        }
        ChangeDefinition::NodeIdentifier { identifier } => ChangeEvent::NodeIdentifierChanged {
            identifier: identifier.clone(),
        },
        ChangeDefinition::NodeType {
            node_type,
            reference,
        } => ChangeEvent::NodeTypeChanged {
            node_type: node_type.clone(),
            reference: reference.clone(),
        },
        ChangeDefinition::Asset { asset } => ChangeEvent::AssetChanged(AssetHandle::new(asset)),
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
[[node_types]]
name = "Document"

[[node_types]]
name = "Text"
supertypes = ["Document"]

[[nodes]]
identifier = "root"
node_type = "Document"
path = "/site"

[[nodes]]
identifier = "n1"
node_type = "Text"
path = "/site/n1"

[[cache_entries]]
id = "page-1"
body = "<p>hello</p>"
tags = ["Everything", "Node_n1"]

[[changes]]
kind = "node"
node = "n1"

[[changes]]
kind = "node_type"
node_type = "Text"
reference = "n1"
"#;

    fn capacity() -> NonZeroUsize {
        NonZeroUsize::new(16).expect("non-zero")
    }

    #[test]
    fn parses_and_builds_world() {
        let fixture = Fixture::parse(FIXTURE).expect("valid fixture");
        let world = fixture.build(capacity()).expect("world builds");

        assert_eq!(world.cache.len(), 1);
        assert_eq!(world.node_types.len(), 2);
        assert_eq!(world.changes.len(), 2);
        assert_eq!(world.changes[0].kind(), "node");
        assert!(matches!(
            &world.changes[1],
            ChangeEvent::NodeTypeChanged { node_type, reference: Some(reference) }
                if node_type == "Text" && reference == "n1"
        ));
    }

    #[test]
    fn unknown_node_in_change_is_rejected() {
        let mut fixture = Fixture::parse(FIXTURE).expect("valid fixture");
        fixture.changes.push(ChangeDefinition::Node {
            node: "missing".to_string(),
            workspace: default_workspace(),
        });

        let err = fixture.build(capacity()).err().expect("unknown node");
        assert!(matches!(err, InfraError::Fixture { .. }));
    }

    #[test]
    fn unknown_change_kind_fails_to_parse() {
        let err = Fixture::parse("[[changes]]\nkind = \"teleport\"\n").expect_err("bad kind");
        assert!(matches!(err, InfraError::Fixture { .. }));
    }

    #[test]
    fn empty_fixture_is_valid() {
        let world = Fixture::parse("")
            .expect("empty fixture")
            .build(capacity())
            .expect("empty world");
        assert!(world.cache.is_empty());
        assert!(world.changes.is_empty());
    }
}
