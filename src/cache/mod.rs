//! Tag-based content cache invalidation.
//!
//! Content changes are registered with a [`ContentCacheFlusher`] while a unit
//! of work runs. The flusher derives the affected cache tags:
//!
//! - `Everything` for any change
//! - `Node_{id}` and `DescendantOf_{id}` for the changed node
//! - `DescendantOf_{id}` for each ancestor of a changed node
//! - `NodeType_{name}` for the node type and all of its supertypes
//! - `AssetDynamicTag_{id}` for changed assets used in node properties
//!
//! Nothing is flushed until [`ContentCacheFlusher::commit`] runs at the end of
//! the unit of work; each tag is then flushed exactly once.
//!
//! ## Configuration
//!
//! ```toml
//! [flusher]
//! enabled = true
//! show_invisible_content = true
//! show_inaccessible_content = true
//! ```

mod config;
mod contexts;
mod events;
mod flusher;
mod lock;
mod pending;
mod supertypes;
mod tags;

pub use self::config::FlusherConfig;
pub use contexts::{RenderContexts, context_key};
pub use events::ChangeEvent;
pub use flusher::{CommitReport, ContentCacheFlusher, FlushError, FlusherCollaborators};
pub use pending::{PendingInvalidations, PendingTag};
pub use supertypes::implemented_type_names;
pub use tags::{CacheTag, TAG_EVERYTHING};

pub(crate) use lock::{mutex_lock, rw_read, rw_write};
