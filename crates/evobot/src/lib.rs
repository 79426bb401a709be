//! Self-evolving chat assistant.
//!
//! This is the facade crate that wires the lower-level components together:
//! - [`knowledge_store`]: learned question → answers, exact and fuzzy lookup
//! - [`pattern_table`]: canned small-talk rules
//! - [`web_lookup`]: cached web search behind an injected capability
//! - [`interaction_memory`]: bounded log of past exchanges
//! - [`ngram_model`]: word n-gram generator
//! - [`learning_policy`]: decides what is worth learning
//!
//! A [`Bot`] answers each input by trying those sources in a fixed order and
//! learns as it goes. [`Session`] adds the conversational bits a front-end
//! needs (training mode, feedback on the last reply) and [`SharedBot`] lets a
//! front-end run the bot on a worker thread.
//!
//! # Quick Start
//!
//! ```
//! use evobot::{Bot, BotConfig};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let mut bot = Bot::new(BotConfig::default(), SmallRng::seed_from_u64(42));
//! bot.teach("qual a capital do brasil", "A capital do Brasil é Brasília.");
//! assert_eq!(bot.respond("Qual a capital do Brasil"), "A capital do Brasil é Brasília.");
//! ```

mod config;
pub mod defaults;
mod session;
mod shared;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chat_core::word_count;
use chrono::Utc;
use interaction_memory::{Context, InteractionMemory};
use knowledge_store::KnowledgeStore;
use learning_policy::LearningPolicy;
use ngram_model::NGramModel;
use pattern_table::PatternTable;
use rand::Rng;
use tracing::{debug, info, warn};

pub use config::{BotConfig, ConfigError, StatePaths, default_state_dir};
pub use session::{Mode, Reply, Session};
pub use shared::SharedBot;

// Re-export the component types front-ends need.
pub use chat_core::PersistError;
pub use learning_policy::PolicyConfig;
pub use web_lookup::{
    ScrapingBackend, SearchBackend, SearchError, SearchHit, WebCapability, WebConfig, WebLookup,
};

use defaults::{DEFAULT_KNOWLEDGE, FALLBACK_PHRASES, INTERROGATIVES, WEB_TRIGGERS};

/// Which stage of the cascade produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Knowledge,
    Pattern,
    Web,
    Memory,
    Generated,
    Fallback,
}

/// Stages tried in order; the first one with an answer wins.
const CASCADE: [Source; 5] = [
    Source::Knowledge,
    Source::Pattern,
    Source::Web,
    Source::Memory,
    Source::Generated,
];

/// The caller-facing interface shared by [`Bot`] and [`SharedBot`].
pub trait ChatBot {
    /// Reply to one line of user text. Never empty.
    fn respond(&mut self, input: &str) -> String;
    /// Learn `answer` for `question` unconditionally. Returns `false` if
    /// either side is blank.
    fn teach(&mut self, question: &str, answer: &str) -> bool;
    /// Rate a past exchange in `[0, 1]` and get an acknowledgment back.
    fn provide_feedback(&mut self, input: &str, response: &str, score: f64) -> String;
    /// Turn web search on or off. Returns the effective state, which stays
    /// off when no web lookup is attached.
    fn set_web_enabled(&mut self, enabled: bool) -> bool;
    fn set_auto_learn(&mut self, enabled: bool);
    fn save_state(&mut self) -> Result<(), PersistError>;
    fn load_state(&mut self);
}

/// The assistant: response cascade plus learning loop.
///
/// Generic over the PRNG type `R` for testability.
pub struct Bot<R: Rng> {
    config: BotConfig,
    knowledge: KnowledgeStore,
    patterns: PatternTable,
    memory: InteractionMemory,
    model: NGramModel,
    policy: LearningPolicy,
    web: Option<WebLookup>,
    web_enabled: bool,
    state: Option<StatePaths>,
    rng: R,
}

impl<R: Rng> Bot<R> {
    /// An in-memory bot with the built-in patterns, default knowledge and a
    /// bootstrapped language model. Nothing is read from or written to disk.
    pub fn new(config: BotConfig, rng: R) -> Self {
        let mut bot = Bot::blank(config, rng).with_patterns(PatternTable::portuguese());
        bot.model = NGramModel::bootstrapped(bot.config.ngram_order);
        bot.seed_defaults();
        bot
    }

    /// A bot that knows nothing: no patterns, no knowledge, empty model.
    pub fn blank(config: BotConfig, rng: R) -> Self {
        let mut policy = LearningPolicy::with_config(config.policy.clone());
        policy.set_enabled(config.auto_learn);
        Bot {
            knowledge: KnowledgeStore::new().with_threshold(config.fuzzy_threshold),
            patterns: PatternTable::empty(),
            memory: InteractionMemory::with_capacity(config.memory_capacity),
            model: NGramModel::with_order(config.ngram_order),
            policy,
            web: None,
            web_enabled: config.web.enabled,
            state: None,
            config,
            rng,
        }
    }

    /// A bot restored from the configured state directory, with the built-in
    /// patterns and default knowledge. Missing or broken state files fall
    /// back to empty components (logged).
    pub fn open(config: BotConfig, rng: R) -> Self {
        let dir = config.resolved_state_dir();
        let mut bot = Bot::blank(config, rng)
            .with_patterns(PatternTable::portuguese())
            .with_state_dir(dir);
        bot.load_state();
        bot.seed_defaults();
        bot
    }

    /// A bot with the built-in patterns that saves into the configured state
    /// directory but starts from nothing: saved state is not read and the
    /// default knowledge is not seeded.
    pub fn fresh(config: BotConfig, rng: R) -> Self {
        let dir = config.resolved_state_dir();
        Bot::blank(config, rng)
            .with_patterns(PatternTable::portuguese())
            .with_state_dir(dir)
    }

    /// Save state into `dir` from now on. Does not read anything.
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir: PathBuf = dir.into();
        let paths = StatePaths::new(&dir);
        self.knowledge = std::mem::take(&mut self.knowledge).with_file(&paths.knowledge);
        self.state = Some(paths);
        self
    }

    pub fn with_patterns(mut self, patterns: PatternTable) -> Self {
        self.patterns = patterns;
        self
    }

    /// Attach a web lookup. Its cache is restored from the state directory
    /// if one is set.
    pub fn with_web(mut self, mut web: WebLookup) -> Self {
        if let Some(paths) = &self.state {
            web.load_cache(&paths.web_cache);
        }
        self.web = Some(web);
        self
    }

    /// Teach the built-in knowledge that is not known yet, and train the
    /// model on those answers. Repeated calls change nothing.
    pub fn seed_defaults(&mut self) {
        let fresh: Vec<(&str, &str)> = DEFAULT_KNOWLEDGE
            .iter()
            .copied()
            .filter(|(q, a)| {
                !self
                    .knowledge
                    .exact(q)
                    .is_some_and(|known| known.iter().any(|k| k == a))
            })
            .collect();
        if fresh.is_empty() {
            return;
        }
        self.knowledge.teach_all(fresh.iter().copied());
        for (_, answer) in &fresh {
            self.model.train(answer);
        }
        info!(pairs = fresh.len(), "seeded default knowledge");
    }

    /// Reply to `input`.
    pub fn respond(&mut self, input: &str) -> String {
        self.respond_with_source(input).0
    }

    /// Reply to `input` and report which stage answered.
    ///
    /// Every reply except a web answer is recorded in memory and offered to
    /// the learning policy. Web answers record themselves with their source.
    pub fn respond_with_source(&mut self, input: &str) -> (String, Source) {
        let (response, source) = self.run_cascade(input);
        debug!(?source, "reply chosen");
        if source == Source::Web {
            return (response, source);
        }

        self.memory.record(input, &response, None);
        if self.policy.should_learn(input, &response, None) {
            info!(input, "auto-learning exchange");
            self.absorb(input, &response);
        }
        (response, source)
    }

    fn run_cascade(&mut self, input: &str) -> (String, Source) {
        for stage in CASCADE {
            if let Some(response) = self.try_stage(stage, input) {
                return (response, stage);
            }
        }
        (self.fallback(), Source::Fallback)
    }

    fn try_stage(&mut self, stage: Source, input: &str) -> Option<String> {
        match stage {
            Source::Knowledge => self.knowledge.lookup(input, &mut self.rng),
            Source::Pattern => self.patterns.find(input, &mut self.rng),
            Source::Web => self.from_web(input),
            Source::Memory => {
                let response = self.memory.most_relevant(input)?.response().to_string();
                self.model.train(&response);
                Some(response)
            }
            Source::Generated => {
                let generated =
                    self.model
                        .generate(input, self.config.generation_length, &mut self.rng);
                (word_count(&generated) > word_count(input)).then_some(generated)
            }
            Source::Fallback => Some(self.fallback()),
        }
    }

    fn from_web(&mut self, input: &str) -> Option<String> {
        if !self.should_search_web(input) {
            return None;
        }
        let web = self.web.as_mut()?;
        match web.answer(input) {
            Ok(None) => None,
            Ok(Some(result)) => {
                let mut context = Context::new();
                context.insert("source".into(), "web_search".into());
                context.insert("timestamp".into(), Utc::now().to_rfc3339());
                self.memory.record(input, &result, Some(context));
                self.model.train(&result);
                Some(result)
            }
            Err(e) => {
                warn!(error = %e, "web search failed");
                None
            }
        }
    }

    /// Web search is used when it is enabled and reachable, and the input
    /// either names a search trigger or is a question of three or more
    /// words that local knowledge cannot answer.
    fn should_search_web(&self, input: &str) -> bool {
        if !self.web_enabled || !self.web.as_ref().is_some_and(WebLookup::is_reachable) {
            return false;
        }
        let lowered = input.to_lowercase();
        if WEB_TRIGGERS.iter().any(|t| lowered.contains(t)) {
            return true;
        }
        let is_question = INTERROGATIVES.iter().any(|q| lowered.contains(q));
        let known = self.knowledge.exact(input).is_some() || self.knowledge.best_match(input).is_some();
        is_question && !known && word_count(input) >= 3
    }

    fn fallback(&mut self) -> String {
        FALLBACK_PHRASES[self.rng.random_range(0..FALLBACK_PHRASES.len())].to_string()
    }

    /// Learn an exchange the policy approved.
    fn absorb(&mut self, input: &str, response: &str) {
        self.knowledge.teach(input, response);
        self.model.train(response);
    }

    /// Learn a taught pair and save all state.
    pub fn teach(&mut self, question: &str, answer: &str) -> bool {
        if !self.learn_taught(question, answer) {
            return false;
        }
        self.knowledge.add(question, answer);
        info!(question, "taught new answer");
        self.save_after("teaching");
        true
    }

    /// Model and memory side of teaching. Knowledge is left to the caller so
    /// bulk training can write it once.
    fn learn_taught(&mut self, question: &str, answer: &str) -> bool {
        if question.trim().is_empty() || answer.trim().is_empty() {
            debug!("ignoring blank training pair");
            return false;
        }
        self.model.train(answer);
        let mut context = Context::new();
        context.insert("source".into(), "training".into());
        context.insert("feedback".into(), "1.0".into());
        self.memory.record(question, answer, Some(context));
        true
    }

    /// Teach every `question<TAB>answer` line of a file, then save once.
    ///
    /// Blank lines and lines starting with `#` are skipped, as are lines
    /// without a tab. Returns how many pairs were taught.
    pub fn train_from_file(&mut self, path: &Path) -> io::Result<usize> {
        let pairs = load_training_pairs(path)?;
        let mut taught = Vec::with_capacity(pairs.len());
        for (question, answer) in &pairs {
            if self.learn_taught(question, answer) {
                taught.push((question.as_str(), answer.as_str()));
            }
        }
        for (question, answer) in &taught {
            self.knowledge.add(question, answer);
        }
        info!(pairs = taught.len(), path = %path.display(), "trained from file");
        self.save_after("training from file");
        Ok(taught.len())
    }

    /// Save everything once. [`save_state`](Self::save_state) already warns
    /// about each failed component.
    fn save_after(&mut self, what: &str) {
        if let Err(e) = self.save_state() {
            debug!(error = %e, "state not saved after {what}");
        }
    }

    /// Acknowledge a rating of a past exchange, learning it when the rating
    /// is positive and the policy agrees.
    pub fn provide_feedback(&mut self, input: &str, response: &str, score: f64) -> String {
        if score >= self.policy.config().threshold {
            if self.policy.should_learn(input, response, Some(score)) {
                info!(input, score, "learning from positive feedback");
                self.absorb(input, response);
            }
            defaults::POSITIVE_FEEDBACK.to_string()
        } else {
            defaults::NEGATIVE_FEEDBACK.to_string()
        }
    }

    /// Turn web search on or off; stays off without an attached lookup.
    pub fn set_web_enabled(&mut self, enabled: bool) -> bool {
        self.web_enabled = enabled && self.web.is_some();
        self.web_enabled
    }

    pub fn set_auto_learn(&mut self, enabled: bool) {
        self.policy.set_enabled(enabled);
    }

    pub fn is_web_enabled(&self) -> bool {
        self.web_enabled && self.web.is_some()
    }

    pub fn is_auto_learn_enabled(&self) -> bool {
        self.policy.is_enabled()
    }

    /// Write every component to the state directory.
    ///
    /// Each failure is logged; all components are attempted and the first
    /// error is returned. Without a state directory this does nothing.
    pub fn save_state(&mut self) -> Result<(), PersistError> {
        let Some(paths) = &self.state else {
            return Ok(());
        };
        let results = [
            ("knowledge", self.knowledge.save(&paths.knowledge)),
            ("memories", self.memory.save(&paths.memories)),
            ("language model", self.model.save(&paths.language_model)),
            (
                "search cache",
                self.web
                    .as_ref()
                    .map_or(Ok(()), |web| web.save_cache(&paths.web_cache)),
            ),
        ];

        let mut first_error = None;
        for (what, result) in results {
            if let Err(e) = result {
                warn!(error = %e, "failed to save {what}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    knowledge = self.knowledge.len(),
                    memories = self.memory.len(),
                    ngrams = self.model.len(),
                    "state saved"
                );
                Ok(())
            }
        }
    }

    /// Reload every component from the state directory. Without a state
    /// directory this does nothing.
    pub fn load_state(&mut self) {
        let Some(paths) = &self.state else {
            return;
        };
        self.knowledge = KnowledgeStore::open(&paths.knowledge).with_threshold(self.config.fuzzy_threshold);
        self.memory = InteractionMemory::open(&paths.memories, self.config.memory_capacity);
        self.model = NGramModel::open(&paths.language_model, self.config.ngram_order);
        if let Some(web) = self.web.as_mut() {
            web.load_cache(&paths.web_cache);
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn memory(&self) -> &InteractionMemory {
        &self.memory
    }

    pub fn model(&self) -> &NGramModel {
        &self.model
    }

    pub fn policy(&self) -> &LearningPolicy {
        &self.policy
    }

    pub fn web(&self) -> Option<&WebLookup> {
        self.web.as_ref()
    }

    pub fn state_paths(&self) -> Option<&StatePaths> {
        self.state.as_ref()
    }
}

impl<R: Rng> ChatBot for Bot<R> {
    fn respond(&mut self, input: &str) -> String {
        Bot::respond(self, input)
    }

    fn teach(&mut self, question: &str, answer: &str) -> bool {
        Bot::teach(self, question, answer)
    }

    fn provide_feedback(&mut self, input: &str, response: &str, score: f64) -> String {
        Bot::provide_feedback(self, input, response, score)
    }

    fn set_web_enabled(&mut self, enabled: bool) -> bool {
        Bot::set_web_enabled(self, enabled)
    }

    fn set_auto_learn(&mut self, enabled: bool) {
        Bot::set_auto_learn(self, enabled)
    }

    fn save_state(&mut self) -> Result<(), PersistError> {
        Bot::save_state(self)
    }

    fn load_state(&mut self) {
        Bot::load_state(self)
    }
}

/// Load training pairs (`question<TAB>answer`, one per line, `#` comments).
pub fn load_training_pairs(path: &Path) -> io::Result<Vec<(String, String)>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|line| {
            let (question, answer) = line.split_once('\t')?;
            Some((question.trim().to_string(), answer.trim().to_string()))
        })
        .collect())
}
