//! Thread-shareable bot handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chat_core::PersistError;
use rand::Rng;

use crate::{Bot, ChatBot};

/// A [`Bot`] behind `Arc<Mutex<_>>`.
///
/// Every call holds the lock for the whole operation, so a reply, a teach and
/// a save never interleave. A poisoned lock is recovered: each store
/// mutation is a single step, so the state behind it is still consistent.
pub struct SharedBot<R: Rng> {
    inner: Arc<Mutex<Bot<R>>>,
}

impl<R: Rng> Clone for SharedBot<R> {
    fn clone(&self) -> Self {
        SharedBot {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Rng> SharedBot<R> {
    pub fn new(bot: Bot<R>) -> Self {
        SharedBot {
            inner: Arc::new(Mutex::new(bot)),
        }
    }

    /// Lock the bot for direct access.
    pub fn lock(&self) -> MutexGuard<'_, Bot<R>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Rng + Send + 'static> SharedBot<R> {
    /// Run [`respond`](Bot::respond) on a worker thread.
    pub fn respond_in_background(&self, input: impl Into<String>) -> JoinHandle<String> {
        let bot = self.clone();
        let input = input.into();
        thread::spawn(move || bot.lock().respond(&input))
    }
}

impl<R: Rng> ChatBot for SharedBot<R> {
    fn respond(&mut self, input: &str) -> String {
        self.lock().respond(input)
    }

    fn teach(&mut self, question: &str, answer: &str) -> bool {
        self.lock().teach(question, answer)
    }

    fn provide_feedback(&mut self, input: &str, response: &str, score: f64) -> String {
        self.lock().provide_feedback(input, response, score)
    }

    fn set_web_enabled(&mut self, enabled: bool) -> bool {
        self.lock().set_web_enabled(enabled)
    }

    fn set_auto_learn(&mut self, enabled: bool) {
        self.lock().set_auto_learn(enabled)
    }

    fn save_state(&mut self) -> Result<(), PersistError> {
        self.lock().save_state()
    }

    fn load_state(&mut self) {
        self.lock().load_state()
    }
}
