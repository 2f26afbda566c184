//! Application layer: collaborator contracts and top-level errors.

pub mod error;
pub mod repos;
