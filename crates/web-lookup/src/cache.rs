//! Bounded search-result cache with oldest-first eviction.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use chat_core::{PersistError, load_json, save_json};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One formatted search result, keyed by its normalized query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry is younger than `max_age` at `now`.
    pub fn is_fresh(&self, max_age: TimeDelta, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) < max_age
    }
}

/// Insertion-ordered cache holding at most `capacity` entries.
///
/// `order` lists every key in `entries` exactly once, oldest first.
#[derive(Debug, Clone)]
pub struct WebCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    capacity: usize,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    entries: BTreeMap<&'a str, &'a CacheEntry>,
    order: Vec<&'a str>,
}

/// On-disk shape before validation. Entries stay untyped so one bad entry
/// does not poison the rest of the file.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    entries: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    order: Vec<String>,
}

impl WebCache {
    pub fn new(capacity: usize) -> Self {
        WebCache {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// The entry for `key` if it is still fresh.
    pub fn get(&self, key: &str, max_age: TimeDelta, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|e| e.is_fresh(max_age, now))
    }

    /// Insert or replace an entry, evicting the oldest while over capacity.
    ///
    /// Replacing an existing key moves it to the newest position.
    pub fn insert(&mut self, entry: CacheEntry) {
        if self.capacity == 0 {
            return;
        }
        let key = entry.query.clone();
        if self.entries.insert(key.clone(), entry).is_some() {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key);

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            debug!(query = %oldest, "evicted cached search");
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Restore a cache from a JSON file, dropping malformed entries.
    ///
    /// An entry is kept only if it deserializes, has a non-blank result and
    /// its key matches its own query. Keys missing from the saved order are
    /// appended by timestamp; unknown or repeated order keys are ignored.
    pub fn load(path: &Path, capacity: usize) -> Result<Self, PersistError> {
        let raw: RawSnapshot = load_json(path)?;

        let mut valid: HashMap<String, CacheEntry> = HashMap::new();
        for (key, value) in raw.entries {
            match serde_json::from_value::<CacheEntry>(value) {
                Ok(entry) if !entry.result.trim().is_empty() && entry.query == key => {
                    valid.insert(key, entry);
                }
                _ => debug!(query = %key, "dropping malformed cache entry"),
            }
        }

        let mut seen = HashSet::new();
        let mut order: Vec<String> = raw
            .order
            .into_iter()
            .filter(|k| valid.contains_key(k) && seen.insert(k.clone()))
            .collect();
        let mut stray: Vec<&CacheEntry> = valid.values().filter(|e| !seen.contains(&e.query)).collect();
        stray.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.query.cmp(&b.query))
        });
        order.extend(stray.into_iter().map(|e| e.query.clone()));

        let mut cache = WebCache::new(capacity);
        for key in order {
            if let Some(entry) = valid.remove(&key) {
                cache.insert(entry);
            }
        }
        Ok(cache)
    }

    /// Restore from `path`, falling back to an empty cache (logged).
    pub fn open(path: &Path, capacity: usize) -> Self {
        match WebCache::load(path, capacity) {
            Ok(cache) => {
                info!(entries = cache.len(), path = %path.display(), "search cache loaded");
                cache
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "no saved search cache");
                WebCache::new(capacity)
            }
            Err(e) => {
                warn!(error = %e, "failed to load search cache, starting empty");
                WebCache::new(capacity)
            }
        }
    }

    /// Write the cache to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let snapshot = Snapshot {
            entries: self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            order: self.keys().collect(),
        };
        save_json(path, &snapshot)
    }
}
