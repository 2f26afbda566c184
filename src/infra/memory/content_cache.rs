//! Tag-indexed content cache.
//!
//! Keeps rendered entries in an LRU with a tag index on the side:
//! entry id -> (body, tags) and tag -> entry ids. Both maps are kept in step
//! on insert, eviction and flush.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::trace;

use crate::application::repos::{ContentCacheSink, RepoError};
use crate::cache::{rw_read, rw_write};

const SOURCE: &str = "infra::memory::content_cache";
const METRIC_STORE_EVICT: &str = "tagflush_store_evict_total";

#[derive(Debug, Clone)]
struct CachedEntry {
    body: Bytes,
    tags: HashSet<String>,
}

/// Lock order is always `entries` before `tag_index`.
pub struct InMemoryContentCache {
    entries: RwLock<LruCache<String, CachedEntry>>,
    tag_index: RwLock<HashMap<String, HashSet<String>>>,
}

impl InMemoryContentCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            tag_index: RwLock::new(HashMap::new()),
        }
    }

    /// Store an entry under `id`, replacing any previous entry and its tags.
    pub fn set<I, T>(&self, id: impl Into<String>, body: impl Into<Bytes>, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let id = id.into();
        let entry = CachedEntry {
            body: body.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        };

        let mut entries = rw_write(&self.entries, SOURCE, "set.entries");
        let mut tag_index = rw_write(&self.tag_index, SOURCE, "set.tag_index");

        for tag in &entry.tags {
            tag_index.entry(tag.clone()).or_default().insert(id.clone());
        }

        if let Some((displaced_id, displaced)) = entries.push(id.clone(), entry) {
            if displaced_id == id {
                // Replaced in place: drop tags the new entry no longer carries.
                let current = entries.peek(&id).map(|e| e.tags.clone()).unwrap_or_default();
                let stale: Vec<&String> = displaced.tags.difference(&current).collect();
                unindex(&mut tag_index, &id, stale);
            } else {
                counter!(METRIC_STORE_EVICT).increment(1);
                trace!(entry = %displaced_id, "Evicted cache entry");
                unindex(&mut tag_index, &displaced_id, displaced.tags.iter());
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Bytes> {
        rw_write(&self.entries, SOURCE, "get")
            .get(id)
            .map(|entry| entry.body.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains(id)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live entries carrying `tag`.
    pub fn count_tagged(&self, tag: &str) -> usize {
        rw_read(&self.tag_index, SOURCE, "count_tagged")
            .get(tag)
            .map_or(0, HashSet::len)
    }

    fn remove_tagged(&self, tag: &str) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "flush.entries");
        let mut tag_index = rw_write(&self.tag_index, SOURCE, "flush.tag_index");

        let Some(ids) = tag_index.remove(tag) else {
            return 0;
        };

        let mut removed = 0;
        for id in ids {
            if let Some(entry) = entries.pop(&id) {
                removed += 1;
                unindex(&mut tag_index, &id, entry.tags.iter());
            }
        }
        removed
    }
}

fn unindex<'a>(
    tag_index: &mut HashMap<String, HashSet<String>>,
    id: &str,
    tags: impl IntoIterator<Item = &'a String>,
) {
    for tag in tags {
        if let Some(ids) = tag_index.get_mut(tag) {
            ids.remove(id);
            if ids.is_empty() {
                tag_index.remove(tag);
            }
        }
    }
}

#[async_trait]
impl ContentCacheSink for InMemoryContentCache {
    async fn flush_by_tag(&self, tag: &str) -> Result<usize, RepoError> {
        Ok(self.remove_tagged(tag))
    }
}
