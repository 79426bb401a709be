//! Word-level n-gram table and random-walk text generation.
//!
//! The model maps every run of `order - 1` consecutive words to the list of
//! words that followed it in training text. Successors are kept in observation
//! order with duplicates, so picking one uniformly at random reproduces the
//! observed frequencies without storing counts.
//!
//! Keys are the context words joined with a single space. Training splits on
//! whitespace, so a word can never contain the separator and keys are
//! unambiguous.
//!
//! The table only grows. Nothing is ever pruned.

use std::collections::BTreeMap;
use std::path::Path;

use chat_core::{PersistError, load_json, save_json};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default n-gram order: one context word predicts the next.
pub const DEFAULT_ORDER: usize = 2;

/// Sentences a fresh model is trained on when no saved model exists.
pub const BOOTSTRAP_CORPUS: &[&str] = &[
    "Olá, como posso ajudar você hoje?",
    "Estou aqui para responder suas perguntas.",
    "Posso ajudar com várias tarefas e responder perguntas diversas.",
    "Me conte mais sobre o que você precisa saber.",
    "Estou aprendendo a cada conversa que temos.",
    "Se tiver dúvidas é só perguntar.",
    "Minha função é ajudar e aprender com nossas interações.",
    "Como um assistente virtual, estou sempre aprendendo.",
    "Posso responder perguntas sobre diversos assuntos.",
    "Estou evoluindo a cada conversa que temos.",
    "Se tiver alguma dúvida específica, por favor pergunte.",
    "Estou aqui para auxiliar no que precisar.",
    "Posso te ajudar com informações e respostas.",
    "Vamos conversar e aprender juntos.",
    "Sou um bot que evolui com cada interação.",
];

/// N-gram successor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NGramModel {
    order: usize,
    ngrams: BTreeMap<String, Vec<String>>,
}

impl NGramModel {
    /// Create an empty order-2 model.
    pub fn new() -> Self {
        NGramModel::with_order(DEFAULT_ORDER)
    }

    /// Create an empty model of the given order.
    ///
    /// Orders below 2 have no context words and are raised to 2.
    pub fn with_order(order: usize) -> Self {
        NGramModel {
            order: order.max(2),
            ngrams: BTreeMap::new(),
        }
    }

    /// Create a model of the given order trained on [`BOOTSTRAP_CORPUS`].
    pub fn bootstrapped(order: usize) -> Self {
        let mut model = NGramModel::with_order(order);
        for sentence in BOOTSTRAP_CORPUS {
            model.train(sentence);
        }
        model
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of distinct context keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.ngrams.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ngrams.is_empty()
    }

    /// Observed successors of a context key, in observation order.
    pub fn successors(&self, key: &str) -> Option<&[String]> {
        self.ngrams.get(key).map(Vec::as_slice)
    }

    /// Learn from one text.
    ///
    /// Each window of `order` consecutive words adds its last word to the
    /// successor list of its first `order - 1` words. Text with fewer than
    /// `order` words teaches nothing.
    pub fn train(&mut self, text: &str) {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < self.order {
            return;
        }
        for window in words.windows(self.order) {
            let (context, next) = window.split_at(self.order - 1);
            self.ngrams
                .entry(context.join(" "))
                .or_default()
                .push(next[0].to_string());
        }
    }

    /// Continue `seed` by a random walk over the table.
    ///
    /// The walk starts from the last `order - 1` seed words (fewer if the seed
    /// is shorter). When the current context has successors, one is picked
    /// uniformly and appended; when it has none, the oldest context word is
    /// dropped and the shorter context is tried. The walk stops once the
    /// context is empty or `max_length` words have been appended.
    ///
    /// The result is the seed words followed by the generated words. An empty
    /// seed yields an empty string.
    ///
    /// ```
    /// use ngram_model::NGramModel;
    /// use rand::SeedableRng;
    /// use rand::rngs::SmallRng;
    ///
    /// let mut model = NGramModel::new();
    /// model.train("the cat sat");
    /// let mut rng = SmallRng::seed_from_u64(0);
    /// assert_eq!(model.generate("the", 10, &mut rng), "the cat sat");
    /// ```
    pub fn generate<R: Rng>(&self, seed: &str, max_length: usize, rng: &mut R) -> String {
        let mut result: Vec<&str> = seed.split_whitespace().collect();
        let context_len = self.order - 1;
        let mut window: Vec<&str> = result[result.len().saturating_sub(context_len)..].to_vec();

        let mut appended = 0;
        while appended < max_length && !window.is_empty() {
            match self.ngrams.get(&window.join(" ")) {
                Some(successors) if !successors.is_empty() => {
                    let next = successors[rng.random_range(0..successors.len())].as_str();
                    result.push(next);
                    window.push(next);
                    if window.len() > context_len {
                        window.remove(0);
                    }
                    appended += 1;
                }
                _ => {
                    window.remove(0);
                }
            }
        }

        result.join(" ")
    }

    /// Restore a model from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let mut model: NGramModel = load_json(path)?;
        model.order = model.order.max(2);
        Ok(model)
    }

    /// Restore from `path`, or bootstrap a fresh model of `order`.
    ///
    /// A missing or unreadable file both fall back to the bootstrap corpus.
    pub fn open(path: &Path, order: usize) -> Self {
        match NGramModel::load(path) {
            Ok(model) => {
                if model.order != order {
                    warn!(
                        saved = model.order,
                        configured = order,
                        "saved language model has a different order, keeping saved"
                    );
                }
                info!(ngrams = model.len(), path = %path.display(), "language model loaded");
                model
            }
            Err(e) => {
                if e.is_not_found() {
                    debug!(path = %path.display(), "no saved language model");
                } else {
                    warn!(error = %e, "failed to load language model");
                }
                let model = NGramModel::bootstrapped(order);
                info!(ngrams = model.len(), "language model bootstrapped from default corpus");
                model
            }
        }
    }

    /// Write the model to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        save_json(path, self)
    }
}

impl Default for NGramModel {
    fn default() -> Self {
        Self::new()
    }
}
