//! Learning policy: which exchanges should become knowledge.
//!
//! Two paths lead to learning:
//!
//! 1. **Explicit feedback.** A caller-supplied score above the threshold always
//!    learns, whether or not automatic learning is switched on.
//! 2. **Heuristic quality.** When automatic learning is enabled, the exchange is
//!    scored by [`LearningPolicy::assess`] and learned if the composite score
//!    clears the same threshold.
//!
//! The policy holds no knowledge itself. It answers yes or no and the caller
//! does the teaching.

use std::collections::HashSet;

use chat_core::word_count;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Words need at least this many characters to count for coherence.
const COHERENCE_WORD_MIN_CHARS: usize = 4;

/// Length ratios are capped at this many response words per input word.
const MAX_LENGTH_RATIO: f64 = 10.0;

/// Responses shorter than this many words get the short-response penalty.
const MIN_RESPONSE_WORDS: usize = 3;

/// Length ratios below this get the short-response penalty.
const MIN_LENGTH_RATIO: f64 = 0.3;

const LENGTH_WEIGHT: f64 = 0.3;
const COHERENCE_WEIGHT: f64 = 0.4;
const GENERICNESS_WEIGHT: f64 = 0.3;

/// Hedging phrases that mark a response as generic.
pub const DEFAULT_GENERIC_PHRASES: &[&str] = &[
    "não sei",
    "não tenho certeza",
    "desculpe",
    "não posso",
    "não conheço",
    "não entendi",
    "me diga mais",
];

/// Tunable thresholds and phrase list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Both feedback and composite scores must be strictly above this.
    pub threshold: f64,
    /// Composite score given to too-short or disproportionate responses.
    pub short_response_penalty: f64,
    /// Genericness multiplier applied once per generic phrase found.
    pub generic_penalty: f64,
    /// Lowercase phrases matched as substrings of the lowercased response.
    pub generic_phrases: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            threshold: 0.7,
            short_response_penalty: 0.3,
            generic_penalty: 0.7,
            generic_phrases: DEFAULT_GENERIC_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Breakdown of the heuristic score for one exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScore {
    /// `min(response_words / max(1, input_words), 10) / 10`.
    pub length: f64,
    /// Fraction of the input's long words that reappear in the response.
    pub coherence: f64,
    /// 1.0, multiplied down once per generic phrase in the response.
    pub genericness: f64,
    /// Weighted sum, or the short-response penalty. Always in `[0, 1]`.
    pub composite: f64,
    /// Whether the short-response penalty replaced the weighted sum.
    pub penalized: bool,
}

/// Decides whether an (input, response) pair should be learned.
#[derive(Debug, Clone)]
pub struct LearningPolicy {
    config: PolicyConfig,
    auto_learning: bool,
}

impl LearningPolicy {
    /// Default thresholds, automatic learning on.
    pub fn new() -> Self {
        LearningPolicy::with_config(PolicyConfig::default())
    }

    pub fn with_config(config: PolicyConfig) -> Self {
        LearningPolicy {
            config,
            auto_learning: true,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Whether heuristic auto-learning is on.
    pub fn is_enabled(&self) -> bool {
        self.auto_learning
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.auto_learning = enabled;
    }

    /// Flip auto-learning and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.auto_learning = !self.auto_learning;
        self.auto_learning
    }

    /// Should this exchange be learned?
    ///
    /// Explicit feedback above the threshold always says yes. Anything else
    /// (no feedback, or feedback at or below the threshold) falls through to
    /// the heuristic, which only runs while auto-learning is enabled.
    pub fn should_learn(&self, input: &str, response: &str, feedback: Option<f64>) -> bool {
        if feedback.is_some_and(|f| f > self.config.threshold) {
            debug!(?feedback, "explicit feedback accepted");
            return true;
        }
        if !self.auto_learning {
            return false;
        }

        let score = self.assess(input, response);
        let learn = score.composite > self.config.threshold;
        debug!(
            length = score.length,
            coherence = score.coherence,
            genericness = score.genericness,
            composite = score.composite,
            learn,
            "assessed response quality"
        );
        learn
    }

    /// Heuristic quality of `response` as an answer to `input`.
    pub fn assess(&self, input: &str, response: &str) -> QualityScore {
        let input_words = word_count(input);
        let response_words = word_count(response);
        let length =
            (response_words as f64 / input_words.max(1) as f64).min(MAX_LENGTH_RATIO) / MAX_LENGTH_RATIO;

        let coherence = coherence(input, response);

        let lowered = response.to_lowercase();
        let genericness = self
            .config
            .generic_phrases
            .iter()
            .filter(|phrase| lowered.contains(&phrase.to_lowercase()))
            .fold(1.0, |acc, _| acc * self.config.generic_penalty);

        let penalized = response_words < MIN_RESPONSE_WORDS || length < MIN_LENGTH_RATIO;
        let composite = if penalized {
            self.config.short_response_penalty
        } else {
            LENGTH_WEIGHT * length + COHERENCE_WEIGHT * coherence + GENERICNESS_WEIGHT * genericness
        };

        QualityScore {
            length,
            coherence,
            genericness,
            composite: composite.clamp(0.0, 1.0),
            penalized,
        }
    }
}

impl Default for LearningPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn long_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .filter(|w| w.chars().count() >= COHERENCE_WORD_MIN_CHARS)
        .map(str::to_lowercase)
        .collect()
}

fn coherence(input: &str, response: &str) -> f64 {
    let input_words = long_words(input);
    let response_words = long_words(response);
    let common = input_words.intersection(&response_words).count();
    common as f64 / input_words.len().max(1) as f64
}
