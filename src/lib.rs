//! Tag-based content cache invalidation.
//!
//! Content changes are translated into cache tags during a unit of work and
//! flushed from the content cache once, when the unit of work commits.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
