//! Pending invalidation set.
//!
//! Maps each tag to the reason it was marked. Marking an existing tag only
//! replaces its reason, so the set behaves as an idempotent union. The set
//! only shrinks through `drain`.

use std::collections::HashMap;
use std::mem;
use std::sync::Mutex;

use serde::Serialize;

use super::lock::mutex_lock;
use super::tags::CacheTag;

const SOURCE: &str = "cache::pending";

/// A tag waiting to be flushed together with the reason it was marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTag {
    pub tag: String,
    pub reason: String,
}

pub struct PendingInvalidations {
    tags: Mutex<HashMap<String, String>>,
}

impl PendingInvalidations {
    pub fn new() -> Self {
        Self {
            tags: Mutex::new(HashMap::new()),
        }
    }

    /// Mark a tag. The last reason wins.
    pub fn mark(&self, tag: CacheTag, reason: impl Into<String>) {
        mutex_lock(&self.tags, SOURCE, "mark").insert(tag.to_string(), reason.into());
    }

    pub fn contains(&self, tag: &CacheTag) -> bool {
        mutex_lock(&self.tags, SOURCE, "contains").contains_key(&tag.to_string())
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.tags, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the pending tags. Does not change the set.
    pub fn snapshot(&self) -> Vec<PendingTag> {
        let mut tags: Vec<PendingTag> = mutex_lock(&self.tags, SOURCE, "snapshot")
            .iter()
            .map(|(tag, reason)| PendingTag {
                tag: tag.clone(),
                reason: reason.clone(),
            })
            .collect();
        tags.sort_by(|a, b| a.tag.cmp(&b.tag));
        tags
    }

    /// Take every pending tag, sorted, leaving the set empty.
    pub fn drain(&self) -> Vec<PendingTag> {
        let taken = mem::take(&mut *mutex_lock(&self.tags, SOURCE, "drain"));
        let mut tags: Vec<PendingTag> = taken
            .into_iter()
            .map(|(tag, reason)| PendingTag { tag, reason })
            .collect();
        tags.sort_by(|a, b| a.tag.cmp(&b.tag));
        tags
    }
}

impl Default for PendingInvalidations {
    fn default() -> Self {
        Self::new()
    }
}
