//! Node-type registry built from declarative definitions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::repos::{NodeTypesRepo, RepoError};
use crate::domain::error::DomainError;
use crate::domain::nodes::NodeType;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeTypeDefinition {
    pub name: String,
    #[serde(default)]
    pub supertypes: Vec<String>,
}

impl NodeTypeDefinition {
    pub fn new<I, S>(name: impl Into<String>, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            supertypes: supertypes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryNodeTypes {
    types: HashMap<String, Arc<NodeType>>,
}

impl InMemoryNodeTypes {
    /// Resolve the definitions into shared node types.
    ///
    /// Every supertype must itself be defined and inheritance must not loop.
    pub fn from_definitions(definitions: &[NodeTypeDefinition]) -> Result<Self, DomainError> {
        let mut by_name: HashMap<&str, &NodeTypeDefinition> = HashMap::new();
        for definition in definitions {
            if by_name.insert(&definition.name, definition).is_some() {
                return Err(DomainError::validation(format!(
                    "node type `{}` is defined twice",
                    definition.name
                )));
            }
        }

        let mut types = HashMap::new();
        for definition in definitions {
            let mut resolving = HashSet::new();
            resolve(&definition.name, &by_name, &mut types, &mut resolving)?;
        }

        Ok(Self { types })
    }

    pub fn get(&self, name: &str) -> Option<Arc<NodeType>> {
        self.types.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn resolve(
    name: &str,
    definitions: &HashMap<&str, &NodeTypeDefinition>,
    resolved: &mut HashMap<String, Arc<NodeType>>,
    resolving: &mut HashSet<String>,
) -> Result<Arc<NodeType>, DomainError> {
    if let Some(existing) = resolved.get(name) {
        return Ok(Arc::clone(existing));
    }
    let definition = definitions.get(name).ok_or_else(|| {
        DomainError::validation(format!("node type `{name}` is referenced but not defined"))
    })?;
    if !resolving.insert(name.to_string()) {
        return Err(DomainError::invariant(format!(
            "node type `{name}` inherits from itself"
        )));
    }

    let mut supertypes = Vec::with_capacity(definition.supertypes.len());
    for supertype in &definition.supertypes {
        supertypes.push(resolve(supertype, definitions, resolved, resolving)?);
    }
    resolving.remove(name);

    let node_type = Arc::new(NodeType::new(name, supertypes));
    resolved.insert(name.to_string(), Arc::clone(&node_type));
    Ok(node_type)
}

#[async_trait]
impl NodeTypesRepo for InMemoryNodeTypes {
    async fn node_type(&self, name: &str) -> Result<Arc<NodeType>, RepoError> {
        self.get(name).ok_or(RepoError::NotFound)
    }
}
