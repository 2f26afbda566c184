//! Asset-usage index and persistence identities.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::repos::{AssetUsageRepo, PersistenceIdentity, RepoError};
use crate::domain::assets::{AssetHandle, AssetUsage, DimensionValues, NodePropertyUsage};
use crate::domain::error::DomainError;

use super::default_workspace;

const NODE_PROPERTIES_KIND: &str = "node_properties";

fn default_usage_kind() -> String {
    NODE_PROPERTIES_KIND.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsageDefinition {
    #[serde(default = "default_usage_kind")]
    pub kind: String,
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default)]
    pub dimensions: DimensionValues,
}

impl UsageDefinition {
    pub fn in_node(node: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            kind: default_usage_kind(),
            node: node.into(),
            node_type: node_type.into(),
            workspace: default_workspace(),
            dimensions: DimensionValues::new(),
        }
    }

    pub fn other(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            node: String::new(),
            node_type: String::new(),
            workspace: default_workspace(),
            dimensions: DimensionValues::new(),
        }
    }

    fn to_usage(&self) -> Result<AssetUsage, DomainError> {
        if self.kind != NODE_PROPERTIES_KIND {
            return Ok(AssetUsage::Other {
                kind: self.kind.clone(),
            });
        }
        if self.node.trim().is_empty() || self.node_type.trim().is_empty() {
            return Err(DomainError::validation(
                "node property usages need both `node` and `node_type`",
            ));
        }
        Ok(AssetUsage::NodeProperties(NodePropertyUsage {
            node_identifier: self.node.clone(),
            node_type_name: self.node_type.clone(),
            workspace_name: self.workspace.clone(),
            dimension_values: self.dimensions.clone(),
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetDefinition {
    pub handle: String,
    /// Persistent identifier; a random UUID is assigned when absent.
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub usages: Vec<UsageDefinition>,
}

#[derive(Debug)]
struct StoredAsset {
    identifier: String,
    usages: Vec<AssetUsage>,
}

#[derive(Debug, Default)]
pub struct InMemoryAssets {
    assets: HashMap<AssetHandle, StoredAsset>,
    usage_lookups: AtomicUsize,
    identity_lookups: AtomicUsize,
}

impl InMemoryAssets {
    pub fn from_definitions(definitions: &[AssetDefinition]) -> Result<Self, DomainError> {
        let mut assets = HashMap::new();
        for definition in definitions {
            let handle = AssetHandle::new(definition.handle.clone());
            let usages = definition
                .usages
                .iter()
                .map(UsageDefinition::to_usage)
                .collect::<Result<Vec<_>, _>>()?;
            let identifier = definition
                .identifier
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            if assets
                .insert(handle, StoredAsset { identifier, usages })
                .is_some()
            {
                return Err(DomainError::validation(format!(
                    "asset `{}` is defined twice",
                    definition.handle
                )));
            }
        }

        Ok(Self {
            assets,
            ..Default::default()
        })
    }

    pub fn contains(&self, asset: &AssetHandle) -> bool {
        self.assets.contains_key(asset)
    }

    /// Calls to `usage_references` so far.
    pub fn usage_lookups(&self) -> usize {
        self.usage_lookups.load(Ordering::SeqCst)
    }

    /// Calls to `identifier_of` so far.
    pub fn identity_lookups(&self) -> usize {
        self.identity_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetUsageRepo for InMemoryAssets {
    async fn is_in_use(&self, asset: &AssetHandle) -> Result<bool, RepoError> {
        Ok(self
            .assets
            .get(asset)
            .is_some_and(|stored| !stored.usages.is_empty()))
    }

    async fn usage_references(&self, asset: &AssetHandle) -> Result<Vec<AssetUsage>, RepoError> {
        self.usage_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .assets
            .get(asset)
            .map(|stored| stored.usages.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl PersistenceIdentity for InMemoryAssets {
    async fn identifier_of(&self, asset: &AssetHandle) -> Result<String, RepoError> {
        self.identity_lookups.fetch_add(1, Ordering::SeqCst);
        self.assets
            .get(asset)
            .map(|stored| stored.identifier.clone())
            .ok_or(RepoError::NotFound)
    }
}
