//! Domain layer types and invariants.

pub mod assets;
pub mod error;
pub mod nodes;
