//! Web search for the assistant: a pluggable backend behind a result cache.
//!
//! [`WebLookup`] turns a user question into a readable text answer. It owns
//! a [`SearchBackend`], a [`WebCache`] keyed by the normalized query, and an
//! explicit [`WebCapability`] telling it whether the network is usable at all.
//! Capability is decided once by the caller (or by [`WebLookup::connect`],
//! which probes it) and never read from ambient process state.
//!
//! All failures come back as a single [`SearchError`]. The assistant treats
//! any error as "the web step produced nothing" and moves on.

mod backend;
mod cache;

use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use chat_core::{PersistError, normalize};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use backend::{
    ScrapingBackend, SearchBackend, SearchHit, parse_duckduckgo, parse_google, simulated_hits,
};
pub use cache::{CacheEntry, WebCache};

/// Host probed to decide whether the machine is online.
pub const PROBE_ADDR: (&str, u16) = ("www.google.com", 80);

/// Timeout for the connectivity probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Browser-like user agent; the HTML endpoints reject obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Everything that can go wrong during a web search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("web search is offline")]
    Offline,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid search URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("search backend failed: {0}")]
    Backend(String),
}

/// Whether the network may be used. Injected, never discovered implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebCapability {
    Online,
    Offline,
}

impl WebCapability {
    /// Probe connectivity with a short TCP connect to [`PROBE_ADDR`].
    pub fn probe() -> Self {
        let reachable = PROBE_ADDR
            .to_socket_addrs()
            .map(|mut addrs| {
                addrs.any(|addr| TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok())
            })
            .unwrap_or(false);
        if reachable {
            info!("internet connection available");
            WebCapability::Online
        } else {
            info!("no internet connection, web search disabled");
            WebCapability::Offline
        }
    }

    pub fn is_online(self) -> bool {
        self == WebCapability::Online
    }
}

/// Web search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Whether the assistant may consult the web at all.
    pub enabled: bool,
    pub max_results: usize,
    pub timeout_secs: u64,
    pub cache_capacity: usize,
    /// Cached answers older than this are refetched.
    pub max_age_secs: u64,
    pub user_agent: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            enabled: true,
            max_results: 3,
            timeout_secs: 5,
            cache_capacity: 100,
            max_age_secs: 24 * 60 * 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl WebConfig {
    fn max_age(&self) -> TimeDelta {
        i64::try_from(self.max_age_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

/// Cached, capability-gated web search.
pub struct WebLookup {
    backend: Box<dyn SearchBackend>,
    capability: WebCapability,
    config: WebConfig,
    cache: WebCache,
}

impl std::fmt::Debug for WebLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebLookup")
            .field("capability", &self.capability)
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl WebLookup {
    pub fn new(
        backend: impl SearchBackend + 'static,
        capability: WebCapability,
        config: WebConfig,
    ) -> Self {
        let cache = WebCache::new(config.cache_capacity);
        WebLookup {
            backend: Box::new(backend),
            capability,
            config,
            cache,
        }
    }

    /// Build the scraping backend and probe connectivity.
    pub fn connect(config: WebConfig) -> Result<Self, SearchError> {
        let backend = ScrapingBackend::new(&config)?;
        Ok(WebLookup::new(backend, WebCapability::probe(), config))
    }

    /// Whether the network was usable when this lookup was built.
    pub fn is_reachable(&self) -> bool {
        self.capability.is_online()
    }

    pub fn capability(&self) -> WebCapability {
        self.capability
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    pub fn cache(&self) -> &WebCache {
        &self.cache
    }

    /// Answer `query` from the cache or the backend.
    ///
    /// A fresh cached answer is returned without touching the backend, even
    /// when offline. Otherwise hits are formatted, cached and returned. No
    /// hits yields the "nothing found" text, which is not cached.
    pub fn search(&mut self, query: &str) -> Result<String, SearchError> {
        self.search_at(query, Utc::now())
    }

    /// Like [`search`](Self::search), with an explicit clock for staleness.
    pub fn search_at(&mut self, query: &str, now: DateTime<Utc>) -> Result<String, SearchError> {
        Ok(self
            .answer_at(query, now)?
            .unwrap_or_else(|| nothing_found(query.trim())))
    }

    /// Like [`search`](Self::search), but `None` when nothing was found
    /// instead of the "nothing found" text.
    pub fn answer(&mut self, query: &str) -> Result<Option<String>, SearchError> {
        self.answer_at(query, Utc::now())
    }

    pub fn answer_at(
        &mut self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, SearchError> {
        let key = normalize(query);
        if let Some(entry) = self.cache.get(&key, self.config.max_age(), now) {
            debug!(query = %key, "using cached search result");
            return Ok(Some(entry.result.clone()));
        }

        if !self.is_reachable() {
            return Err(SearchError::Offline);
        }

        let hits = if key.is_empty() {
            Vec::new()
        } else {
            self.backend.search(query.trim(), self.config.max_results)?
        };
        if hits.is_empty() {
            debug!(query = %key, "search found nothing");
            return Ok(None);
        }

        let result = format_hits(query.trim(), &hits);
        self.cache.insert(CacheEntry {
            query: key,
            result: result.clone(),
            timestamp: now,
        });
        Ok(Some(result))
    }

    /// Replace the cache with the one saved at `path` (logged on failure).
    pub fn load_cache(&mut self, path: &Path) {
        self.cache = WebCache::open(path, self.config.cache_capacity);
    }

    pub fn save_cache(&self, path: &Path) -> Result<(), PersistError> {
        self.cache.save(path)
    }
}

/// Render hits as a numbered, human-readable answer.
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("Encontrei algumas informações sobre '{query}':\n\n");
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, hit.title));
        if !hit.snippet.is_empty() {
            out.push_str(&format!("   {}\n", hit.snippet));
        }
        if !hit.url.is_empty() {
            out.push_str(&format!("   Link: {}\n", hit.url));
        }
        out.push('\n');
    }
    out.push_str("Espero que essas informações sejam úteis!");
    out
}

/// Answer given when a search returned no hits.
pub fn nothing_found(query: &str) -> String {
    format!("Não foram encontradas informações online sobre '{query}'.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeBackend {
        calls: AtomicUsize,
        hits: Vec<SearchHit>,
        fail: bool,
    }

    impl SearchBackend for FakeBackend {
        fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SearchError::Backend("boom".into()));
            }
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }
    }

    fn hit(n: usize) -> SearchHit {
        SearchHit {
            title: format!("Title {n}"),
            snippet: format!("Snippet {n}"),
            url: format!("https://example.com/{n}"),
        }
    }

    fn lookup(backend: &Arc<FakeBackend>, capability: WebCapability) -> WebLookup {
        WebLookup::new(Arc::clone(backend), capability, WebConfig::default())
    }

    #[test]
    fn formats_numbered_hits() {
        let text = format_hits("gatos", &[hit(1), hit(2)]);
        assert!(text.starts_with("Encontrei algumas informações sobre 'gatos':\n\n1. Title 1\n"));
        assert!(text.contains("   Snippet 2\n   Link: https://example.com/2\n"));
        assert!(text.ends_with("Espero que essas informações sejam úteis!"));
    }

    #[test]
    fn second_search_hits_cache() {
        let backend = Arc::new(FakeBackend {
            hits: vec![hit(1)],
            ..Default::default()
        });
        let mut web = lookup(&backend, WebCapability::Online);
        let first = web.search("O que é DNA").unwrap();
        let second = web.search("  o que é dna ").unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(web.cache().len(), 1);
    }

    #[test]
    fn stale_entry_is_refetched() {
        let backend = Arc::new(FakeBackend {
            hits: vec![hit(1)],
            ..Default::default()
        });
        let mut web = lookup(&backend, WebCapability::Online);
        let then = Utc::now() - TimeDelta::days(2);
        web.search_at("dna", then).unwrap();
        web.search("dna").unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn offline_never_calls_backend() {
        let backend = Arc::new(FakeBackend {
            hits: vec![hit(1)],
            ..Default::default()
        });
        let mut web = lookup(&backend, WebCapability::Offline);
        assert!(!web.is_reachable());
        assert!(matches!(web.search("dna"), Err(SearchError::Offline)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn backend_failure_is_error() {
        let backend = Arc::new(FakeBackend {
            fail: true,
            ..Default::default()
        });
        let mut web = lookup(&backend, WebCapability::Online);
        assert!(matches!(web.search("dna"), Err(SearchError::Backend(_))));
        assert!(web.cache().is_empty());
    }

    #[test]
    fn zero_hits_returns_sentinel_uncached() {
        let backend = Arc::new(FakeBackend::default());
        let mut web = lookup(&backend, WebCapability::Online);
        assert_eq!(web.search("xyz").unwrap(), nothing_found("xyz"));
        assert!(web.cache().is_empty());
        web.search("xyz").unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_hits_is_no_answer() {
        let backend = Arc::new(FakeBackend::default());
        let mut web = lookup(&backend, WebCapability::Online);
        assert_eq!(web.answer("xyz").unwrap(), None);
        assert!(web.cache().is_empty());
    }

    #[test]
    fn blank_query_skips_backend() {
        let backend = Arc::new(FakeBackend {
            hits: vec![hit(1)],
            ..Default::default()
        });
        let mut web = lookup(&backend, WebCapability::Online);
        assert_eq!(web.search("   ").unwrap(), nothing_found(""));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn respects_max_results() {
        let backend = Arc::new(FakeBackend {
            hits: (1..=5).map(hit).collect(),
            ..Default::default()
        });
        let mut web = lookup(&backend, WebCapability::Online);
        let text = web.search("muitos").unwrap();
        assert!(text.contains("3. Title 3"));
        assert!(!text.contains("4. Title 4"));
    }

    #[test]
    fn cache_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web_cache.json");
        let backend = Arc::new(FakeBackend {
            hits: vec![hit(1)],
            ..Default::default()
        });
        let mut web = lookup(&backend, WebCapability::Online);
        let answer = web.search("dna").unwrap();
        web.save_cache(&path).unwrap();

        let mut offline = lookup(&backend, WebCapability::Offline);
        offline.load_cache(&path);
        assert_eq!(offline.search("dna").unwrap(), answer);
    }

    #[test]
    fn config_from_toml_uses_defaults() {
        let config: WebConfig = toml::from_str("max_results = 5\nenabled = false").unwrap();
        assert_eq!(config.max_results, 5);
        assert!(!config.enabled);
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.max_age(), TimeDelta::days(1));
    }
}
