//! Shared text primitives and state-file helpers for the evobot crates.
//!
//! Every lookup strategy in the assistant compares user text the same way:
//! normalize (trim + lowercase), split on whitespace into a word set, and score
//! the overlap between two word sets. This crate owns that comparison so the
//! knowledge store and interaction memory cannot drift apart.
//!
//! It also owns the persistence boundary: each component serializes itself to a
//! single JSON file through [`load_json`] / [`save_json`], and failures surface
//! as one [`PersistError`] type that callers log and swallow.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Words shorter than this (in characters) never count as "common" when
/// scoring overlap. Articles and short particles ("o", "é", "a") would
/// otherwise dominate short questions.
pub const SIGNIFICANT_WORD_MIN_CHARS: usize = 3;

/// Normalize user text: trim surrounding whitespace and lowercase.
///
/// # Examples
///
/// ```
/// assert_eq!(chat_core::normalize("  Qual É Seu Nome? "), "qual é seu nome?");
/// ```
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Number of whitespace-separated words in `text`.
#[inline]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// The set of distinct normalized words in `text`.
pub fn word_set(text: &str) -> HashSet<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Result of comparing two texts by shared words.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// How many significant words the two texts share.
    pub common: usize,
    /// `common / max(|words(a)|, |words(b)|)`, in `[0, 1]`.
    pub score: f64,
}

impl Overlap {
    const NONE: Overlap = Overlap {
        common: 0,
        score: 0.0,
    };
}

/// Word-overlap similarity between two texts.
///
/// Both texts are normalized and reduced to word sets. The numerator counts
/// shared words of at least [`SIGNIFICANT_WORD_MIN_CHARS`] characters; the
/// denominator is the size of the larger word set. Empty input on either side
/// scores zero.
///
/// ```
/// use chat_core::word_overlap;
///
/// let o = word_overlap("qual é o seu nome", "qual é seu nome");
/// assert_eq!(o.common, 3);
/// assert!((o.score - 0.6).abs() < 1e-9);
/// ```
pub fn word_overlap(a: &str, b: &str) -> Overlap {
    let words_a = word_set(a);
    let words_b = word_set(b);
    if words_a.is_empty() || words_b.is_empty() {
        return Overlap::NONE;
    }

    let common = words_a
        .intersection(&words_b)
        .filter(|w| w.chars().count() >= SIGNIFICANT_WORD_MIN_CHARS)
        .count();
    let denominator = words_a.len().max(words_b.len());

    Overlap {
        common,
        score: common as f64 / denominator as f64,
    }
}

/// Failure reading or writing a component's state file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed state in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    /// Whether the file simply does not exist yet (first run).
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Read and deserialize a JSON state file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let content = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| PersistError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` as pretty JSON and write it to `path`.
///
/// Parent directories are created as needed. The file is written next to the
/// target and renamed over it, so a crash mid-write leaves the previous state
/// file intact.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    let io_err = |source: io::Error| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| PersistError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

/// Load a state file, falling back to `T::default()` on any failure.
///
/// A missing file is the normal first-run case and is logged at debug level;
/// anything else (unreadable, malformed) is logged as a warning. `what` names
/// the component in log output.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    match load_json(path) {
        Ok(value) => value,
        Err(e) if e.is_not_found() => {
            debug!(path = %path.display(), "no saved {what}, starting empty");
            T::default()
        }
        Err(e) => {
            warn!(error = %e, "failed to load {what}, starting empty");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Olá Mundo  "), "olá mundo");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn word_count_ignores_extra_whitespace() {
        assert_eq!(word_count("  a   b\tc\n"), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn word_set_deduplicates() {
        let set = word_set("A b a B");
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
        assert!(set.contains("b"));
    }

    #[test]
    fn overlap_one_extra_word() {
        let o = word_overlap("qual é o seu nome", "qual é seu nome");
        assert_eq!(o.common, 3);
        assert!((o.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn overlap_different_last_word_is_exactly_half() {
        let o = word_overlap("qual é seu email", "qual é seu nome");
        assert_eq!(o.common, 2);
        assert!((o.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn overlap_short_words_do_not_count() {
        let o = word_overlap("o é a", "o é a");
        assert_eq!(o.common, 0);
        assert_eq!(o.score, 0.0);
    }

    #[test]
    fn overlap_identical_text_scores_one() {
        let o = word_overlap("como você funciona", "Como Você Funciona");
        assert_eq!(o.common, 3);
        assert!((o.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overlap_empty_side_is_zero() {
        assert_eq!(word_overlap("", "hello world"), Overlap::NONE);
        assert_eq!(word_overlap("hello", "   "), Overlap::NONE);
    }

    #[test]
    fn overlap_counts_multibyte_chars_not_bytes() {
        // "é" is two bytes but one character.
        let o = word_overlap("é", "é");
        assert_eq!(o.common, 0);
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        values: Vec<u32>,
    }

    #[test]
    fn save_then_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sample.json");
        let sample = Sample {
            name: "x".into(),
            values: vec![1, 2, 3],
        };
        save_json(&path, &sample).unwrap();
        let back: Sample = load_json(&path).unwrap();
        assert_eq!(back, sample);
        assert!(!dir.path().join("nested/sample.json.tmp").exists());
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_json::<Sample>(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn load_malformed_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_json::<Sample>(&path).unwrap_err();
        assert!(matches!(err, PersistError::Malformed { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2").unwrap();
        let sample: Sample = load_or_default(&path, "sample");
        assert_eq!(sample, Sample::default());

        let missing: Sample = load_or_default(&dir.path().join("nope.json"), "sample");
        assert_eq!(missing, Sample::default());
    }
}
