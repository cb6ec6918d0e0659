//! Process-lifetime cache of accumulated results per canonical query.
//!
//! Each entry sits behind its own async mutex so that one request at a time
//! advances a given query; different queries never contend. The map itself
//! is bounded by capacity (least recently used goes first) and by an idle TTL.

use crate::common::types::{EventRecord, NormalizedEvent};
use crate::observability::metrics;
use crate::pipeline::dedup::merge_events;
use crate::pipeline::fetch::{FetchMode, QueryFilters};
use crate::pipeline::query::QueryKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Accumulated state for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub items: Vec<EventRecord>,
    /// Next page to fetch; starts at 1.
    pub page: u32,
    pub mode: Option<FetchMode>,
    pub done: bool,
    /// Upstream filters fixed by the first request for this query, so every
    /// page of the sequence is fetched with the same parameters.
    pub filters: Option<QueryFilters>,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            mode: None,
            done: false,
            filters: None,
        }
    }
}

impl CacheEntry {
    /// Re-dedupes the cached items together with a freshly fetched page and
    /// records the new pagination state.
    pub fn commit(
        &mut self,
        fetched: Vec<NormalizedEvent>,
        next_page: u32,
        mode: Option<FetchMode>,
        done: bool,
    ) {
        let existing = std::mem::take(&mut self.items);
        self.items = merge_events(existing.into_iter().chain(fetched.into_iter().map(EventRecord::from)));
        self.page = next_page;
        self.mode = mode;
        self.done = done;
    }
}

pub type EntryHandle = Arc<AsyncMutex<CacheEntry>>;

struct Slot {
    entry: EntryHandle,
    last_access: Instant,
}

impl Slot {
    /// A request still holds a handle to this entry.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.entry) > 1
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub capacity: usize,
    pub ttl: Duration,
}

pub struct QueryCache {
    slots: Mutex<HashMap<QueryKey, Slot>>,
    policy: CachePolicy,
}

impl QueryCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Returns the entry for `key`, creating a fresh one if it is missing or
    /// has been idle longer than the TTL.
    pub fn get_or_create(&self, key: &QueryKey) -> EntryHandle {
        self.get_or_create_at(key, Instant::now())
    }

    fn get_or_create_at(&self, key: &QueryKey, now: Instant) -> EntryHandle {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let ttl = self.policy.ttl;
        let before = slots.len();
        slots.retain(|_, slot| slot.in_use() || now.saturating_duration_since(slot.last_access) <= ttl);
        let expired = before - slots.len();
        if expired > 0 {
            debug!("Expired {} idle cache entries", expired);
            metrics::cache::evicted("ttl", expired);
        }

        if let Some(slot) = slots.get_mut(key) {
            slot.last_access = now;
            metrics::cache::hit();
            return slot.entry.clone();
        }

        metrics::cache::miss();
        // Busy entries are never evicted; the map may briefly exceed capacity.
        while slots.len() >= self.policy.capacity.max(1) {
            let oldest = slots
                .iter()
                .filter(|(_, slot)| !slot.in_use())
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(oldest) => {
                    debug!("Evicting least recently used cache entry {}", oldest);
                    slots.remove(&oldest);
                    metrics::cache::evicted("capacity", 1);
                }
                None => break,
            }
        }

        let entry: EntryHandle = Arc::new(AsyncMutex::new(CacheEntry::default()));
        slots.insert(
            key.clone(),
            Slot {
                entry: entry.clone(),
                last_access: now,
            },
        );
        entry
    }

    /// Replaces the state of `key` with the merge of its cached items and
    /// `fetched`. Callers already holding the entry lock use
    /// [`CacheEntry::commit`] directly.
    pub async fn commit(
        &self,
        key: &QueryKey,
        fetched: Vec<NormalizedEvent>,
        next_page: u32,
        mode: Option<FetchMode>,
        done: bool,
    ) {
        let handle = self.get_or_create(key);
        let mut entry = handle.lock().await;
        entry.commit(fetched, next_page, mode, done);
    }

    /// Drops `key` so the next request starts from page 1 again.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
