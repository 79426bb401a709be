//! Bot configuration, loadable from TOML.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use learning_policy::PolicyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_lookup::WebConfig;

/// Failure reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Tunables for a [`Bot`](crate::Bot). Every field has a default, so a config
/// file only needs the values it changes.
///
/// ```toml
/// memory_capacity = 500
/// fuzzy_threshold = 0.6
///
/// [policy]
/// threshold = 0.8
///
/// [web]
/// enabled = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Where state files live. `None` means [`default_state_dir`].
    pub state_dir: Option<PathBuf>,
    pub memory_capacity: usize,
    /// Minimum word-overlap score (exclusive) for a fuzzy knowledge match.
    pub fuzzy_threshold: f64,
    pub ngram_order: usize,
    /// Maximum words appended by the n-gram generator per reply.
    pub generation_length: usize,
    /// Learn from ordinary conversation without explicit feedback.
    pub auto_learn: bool,
    pub policy: PolicyConfig,
    pub web: WebConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            state_dir: None,
            memory_capacity: interaction_memory::DEFAULT_CAPACITY,
            fuzzy_threshold: knowledge_store::DEFAULT_FUZZY_THRESHOLD,
            ngram_order: ngram_model::DEFAULT_ORDER,
            generation_length: 50,
            auto_learn: true,
            policy: PolicyConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl BotConfig {
    /// Parse a TOML config file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured state directory, or the platform default.
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }
}

/// `<data dir>/evobot`, or `./evobot-data` when the platform has no data dir.
pub fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("evobot"))
        .unwrap_or_else(|| PathBuf::from("evobot-data"))
}

/// The four component state files inside a state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub knowledge: PathBuf,
    pub memories: PathBuf,
    pub language_model: PathBuf,
    pub web_cache: PathBuf,
}

impl StatePaths {
    pub fn new(dir: &Path) -> Self {
        StatePaths {
            knowledge: dir.join("knowledge.json"),
            memories: dir.join("memories.json"),
            language_model: dir.join("language_model.json"),
            web_cache: dir.join("web_cache.json"),
        }
    }
}
