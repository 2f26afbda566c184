//! Transitive supertype closure of a node type.

use std::collections::HashSet;

use crate::domain::nodes::NodeType;

/// Names of the node type itself and every type it inherits from.
///
/// Depth-first, self first, then supertypes in declaration order. A type
/// reachable through several paths is listed once. Names already visited are
/// never expanded again, which also stops on cyclic input.
pub fn implemented_type_names(node_type: &NodeType) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut names = Vec::new();
    let mut stack: Vec<&NodeType> = vec![node_type];

    while let Some(current) = stack.pop() {
        if !visited.insert(current.name()) {
            continue;
        }
        names.push(current.name().to_string());
        // reversed so the first declared supertype is expanded first
        for supertype in current.declared_supertypes().iter().rev() {
            if !visited.contains(supertype.name()) {
                stack.push(supertype.as_ref());
            }
        }
    }

    names
}
