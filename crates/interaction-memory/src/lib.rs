//! Bounded, ordered log of past exchanges with relevance search.
//!
//! [`InteractionMemory`] keeps the most recent [`MemoryRecord`]s in a ring
//! buffer. Once the configured capacity is reached, every new record evicts the
//! oldest one, so the buffer is always in chronological order and never longer
//! than its capacity.
//!
//! [`relevant`](InteractionMemory::relevant) ranks records by the same
//! [`chat_core::word_overlap`] score the knowledge store uses, comparing the
//! query against each record's input.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use chat_core::{PersistError, load_json, save_json, word_overlap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default number of records kept.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default number of results returned by a relevance search.
pub const DEFAULT_TOP_K: usize = 5;

/// Free-form annotations attached to a record (e.g. `source = web_search`).
pub type Context = BTreeMap<String, String>;

/// One remembered exchange. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    input: String,
    response: String,
    #[serde(default)]
    context: Context,
    timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a record stamped with the current instant.
    pub fn new(input: impl Into<String>, response: impl Into<String>, context: Context) -> Self {
        MemoryRecord::at(input, response, context, Utc::now())
    }

    /// Create a record with an explicit timestamp.
    pub fn at(
        input: impl Into<String>,
        response: impl Into<String>,
        context: Context,
        timestamp: DateTime<Utc>,
    ) -> Self {
        MemoryRecord {
            input: input.into(),
            response: response.into(),
            context,
            timestamp,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Look up a single context value.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Fixed-capacity FIFO buffer of [`MemoryRecord`]s.
#[derive(Debug, Clone)]
pub struct InteractionMemory {
    records: VecDeque<MemoryRecord>,
    capacity: usize,
}

impl InteractionMemory {
    /// Create an empty memory with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        InteractionMemory::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty memory holding at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        InteractionMemory {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Remember an exchange, stamped with the current instant.
    pub fn record(&mut self, input: &str, response: &str, context: Option<Context>) {
        self.push(MemoryRecord::new(input, response, context.unwrap_or_default()));
    }

    /// Append a prebuilt record, evicting the oldest one if at capacity.
    pub fn push(&mut self, record: MemoryRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records whose input shares words with `query`, best first.
    ///
    /// Records with no common significant word are skipped. The sort is
    /// stable, so equally scored records keep their chronological order.
    /// At most `top_k` records are returned.
    pub fn relevant(&self, query: &str, top_k: usize) -> Vec<&MemoryRecord> {
        let mut scored: Vec<(&MemoryRecord, f64)> = self
            .records
            .iter()
            .filter_map(|record| {
                let overlap = word_overlap(query, &record.input);
                (overlap.common > 0).then_some((record, overlap.score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().take(top_k).map(|(r, _)| r).collect()
    }

    /// The single most relevant record, if any.
    pub fn most_relevant(&self, query: &str) -> Option<&MemoryRecord> {
        self.relevant(query, 1).into_iter().next()
    }

    /// Iterate records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.records.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Restore a memory snapshot from a JSON file.
    ///
    /// If the snapshot holds more than `capacity` records, only the newest
    /// `capacity` are kept.
    pub fn load(path: &Path, capacity: usize) -> Result<Self, PersistError> {
        let records: Vec<MemoryRecord> = load_json(path)?;
        let mut memory = InteractionMemory::with_capacity(capacity);
        for record in records {
            memory.push(record);
        }
        Ok(memory)
    }

    /// Restore from `path`, falling back to an empty memory (logged).
    pub fn open(path: &Path, capacity: usize) -> Self {
        match InteractionMemory::load(path, capacity) {
            Ok(memory) => {
                info!(records = memory.len(), path = %path.display(), "memories loaded");
                memory
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "no saved memories, starting empty");
                InteractionMemory::with_capacity(capacity)
            }
            Err(e) => {
                warn!(error = %e, "failed to load memories, starting empty");
                InteractionMemory::with_capacity(capacity)
            }
        }
    }

    /// Snapshot the whole buffer to a JSON file, oldest first.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        save_json(path, &self.records)
    }
}

impl Default for InteractionMemory {
    fn default() -> Self {
        Self::new()
    }
}
