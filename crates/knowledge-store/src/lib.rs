//! Learned question → answers store with exact and fuzzy lookup.
//!
//! Keys are normalized user inputs (see [`chat_core::normalize`]); each key maps
//! to the ordered list of responses taught for it. The list preserves learning
//! order, never holds duplicates, and is never empty once the key exists.
//!
//! Lookup tries the exact key first and otherwise falls back to the key with
//! the best [`chat_core::word_overlap`] score strictly above the fuzzy
//! threshold. Keys live in a `BTreeMap`, so "first best key wins" ties resolve
//! the same way on every run.
//!
//! A store opened with [`KnowledgeStore::open`] is write-through: every
//! successful [`teach`](KnowledgeStore::teach) saves the file. Save failures are
//! logged and swallowed; the in-memory map stays authoritative.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chat_core::{PersistError, load_json, normalize, save_json, word_overlap};
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Default minimum word-overlap score (exclusive) for a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.5;

/// On-disk value: a response list, or a bare string written by older stores.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredResponses {
    Many(Vec<String>),
    One(String),
}

/// Persistent mapping from normalized input to learned responses.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    entries: BTreeMap<String, Vec<String>>,
    fuzzy_threshold: f64,
    /// Backing file for write-through saves, if any.
    file: Option<PathBuf>,
}

impl KnowledgeStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        KnowledgeStore {
            entries: BTreeMap::new(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            file: None,
        }
    }

    /// Set the fuzzy-match threshold (builder style).
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Make the store write-through to `path` without reading it.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Open a write-through store backed by `path`.
    ///
    /// A missing or unreadable file yields an empty store (logged); the path is
    /// still used for subsequent saves.
    pub fn open(path: &Path) -> Self {
        let mut store = match KnowledgeStore::load(path) {
            Ok(store) => {
                info!(entries = store.len(), path = %path.display(), "knowledge loaded");
                store
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "no saved knowledge, starting empty");
                KnowledgeStore::new()
            }
            Err(e) => {
                warn!(error = %e, "failed to load knowledge, starting empty");
                KnowledgeStore::new()
            }
        };
        store.file = Some(path.to_path_buf());
        store
    }

    /// Read a store from a JSON file (not write-through).
    ///
    /// Keys are re-normalized; empty response lists and blank responses are
    /// dropped so the loaded map upholds the same invariants as a taught one.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let raw: BTreeMap<String, StoredResponses> = load_json(path)?;
        let mut store = KnowledgeStore::new();
        for (key, value) in raw {
            let responses = match value {
                StoredResponses::Many(list) => list,
                StoredResponses::One(single) => vec![single],
            };
            for response in responses {
                store.insert(&key, response);
            }
        }
        Ok(store)
    }

    /// Write the whole map to `path` as JSON.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        save_json(path, &self.entries)
    }

    /// Save to the backing file, if one is configured. Errors are logged.
    pub fn persist(&self) {
        let Some(path) = &self.file else {
            return;
        };
        match self.save(path) {
            Ok(()) => debug!(entries = self.len(), "knowledge saved"),
            Err(e) => warn!(error = %e, "failed to save knowledge"),
        }
    }

    /// The backing file for write-through saves, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Find a response for `text`: exact key first, then best fuzzy key.
    ///
    /// When the chosen key has several responses, one is picked uniformly at
    /// random.
    pub fn lookup<R: Rng>(&self, text: &str, rng: &mut R) -> Option<String> {
        let responses = match self.exact(text) {
            Some(responses) => responses,
            None => {
                let (key, score) = self.best_match(text)?;
                debug!(key, score, "fuzzy knowledge match");
                self.entries.get(key)?
            }
        };
        let idx = rng.random_range(0..responses.len());
        Some(responses[idx].clone())
    }

    /// Responses stored under the exact normalized form of `text`.
    pub fn exact(&self, text: &str) -> Option<&[String]> {
        self.entries.get(&normalize(text)).map(Vec::as_slice)
    }

    /// The key with the highest overlap score strictly above the threshold.
    ///
    /// Ties keep the first key in iteration (sorted) order.
    pub fn best_match(&self, text: &str) -> Option<(&str, f64)> {
        let input = normalize(text);
        let mut best: Option<(&str, f64)> = None;
        for key in self.entries.keys() {
            let score = word_overlap(&input, key).score;
            if score > self.fuzzy_threshold && best.is_none_or(|(_, s)| score > s) {
                best = Some((key.as_str(), score));
            }
        }
        best
    }

    /// Teach `response` for `text`, then write through to the backing file.
    ///
    /// Returns `true` if the response was new for that key. Blank keys and
    /// blank responses are ignored.
    pub fn teach(&mut self, text: &str, response: &str) -> bool {
        let added = self.insert(text, response.to_string());
        self.persist();
        added
    }

    /// Teach several pairs, writing through once at the end.
    ///
    /// Returns how many responses were new.
    pub fn teach_all<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> usize {
        let mut added = 0;
        for (text, response) in pairs {
            if self.insert(text, response.to_string()) {
                added += 1;
            }
        }
        self.persist();
        added
    }

    /// Add `response` for `text` in memory only, leaving the backing file to
    /// the caller's next [`save`](Self::save).
    pub fn add(&mut self, text: &str, response: &str) -> bool {
        self.insert(text, response.to_string())
    }

    fn insert(&mut self, text: &str, response: String) -> bool {
        let key = normalize(text);
        if key.is_empty() || response.trim().is_empty() {
            debug!("ignoring blank knowledge entry");
            return false;
        }
        let responses = self.entries.entry(key).or_default();
        if responses.contains(&response) {
            return false;
        }
        responses.push(response);
        true
    }

    /// Number of distinct keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been learned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, responses)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl Default for KnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}
