//! Conversation state a front-end keeps around a bot.

use chat_core::PersistError;

use crate::ChatBot;
use crate::defaults::{TRAINING_ASK_ANSWER, TRAINING_LEARNED, TRAINING_STARTED, TRAINING_STOPPED};

/// What the next line of user text means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Lines are questions for the bot.
    #[default]
    Normal,
    /// Lines are a question, then its answer, to be taught.
    Training,
}

/// Something to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The bot's answer.
    Bot(String),
    /// A status message from the session itself.
    System(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Bot(text) | Reply::System(text) => text,
        }
    }
}

/// Wraps a bot with training mode and feedback on the last exchange.
///
/// In training mode the first line is taken as a question and the second as
/// its answer; after teaching the pair the session returns to normal mode.
#[derive(Debug)]
pub struct Session<B> {
    bot: B,
    mode: Mode,
    pending_question: Option<String>,
    last_exchange: Option<(String, String)>,
}

impl<B: ChatBot> Session<B> {
    pub fn new(bot: B) -> Self {
        Session {
            bot,
            mode: Mode::Normal,
            pending_question: None,
            last_exchange: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch modes. Leaving training mode drops a half-entered pair.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Normal {
            self.pending_question = None;
        }
        self.mode = mode;
    }

    /// Enter or leave training mode, returning the status message to show.
    pub fn toggle_training(&mut self) -> Reply {
        match self.mode {
            Mode::Normal => {
                self.set_mode(Mode::Training);
                Reply::System(TRAINING_STARTED.to_string())
            }
            Mode::Training => {
                self.set_mode(Mode::Normal);
                Reply::System(TRAINING_STOPPED.to_string())
            }
        }
    }

    /// Handle one line of user text according to the current mode.
    pub fn handle(&mut self, line: &str) -> Reply {
        match self.mode {
            Mode::Normal => {
                let response = self.bot.respond(line);
                self.last_exchange = Some((line.to_string(), response.clone()));
                Reply::Bot(response)
            }
            Mode::Training => self.handle_training(line),
        }
    }

    fn handle_training(&mut self, line: &str) -> Reply {
        let line = line.trim();
        match self.pending_question.take() {
            None if line.is_empty() => Reply::System(TRAINING_STARTED.to_string()),
            None => {
                self.pending_question = Some(line.to_string());
                Reply::System(TRAINING_ASK_ANSWER.to_string())
            }
            Some(question) if line.is_empty() => {
                self.pending_question = Some(question);
                Reply::System(TRAINING_ASK_ANSWER.to_string())
            }
            Some(question) => {
                self.bot.teach(&question, line);
                self.set_mode(Mode::Normal);
                Reply::System(TRAINING_LEARNED.to_string())
            }
        }
    }

    /// Rate the last exchange. `None` if there has been no exchange yet.
    pub fn feedback(&mut self, score: f64) -> Option<String> {
        let (input, response) = self.last_exchange.as_ref()?;
        Some(self.bot.provide_feedback(input, response, score))
    }

    /// The last (input, reply) pair seen in normal mode.
    pub fn last_exchange(&self) -> Option<(&str, &str)> {
        self.last_exchange
            .as_ref()
            .map(|(input, response)| (input.as_str(), response.as_str()))
    }

    /// Returns whether web search is now on.
    pub fn set_web_enabled(&mut self, enabled: bool) -> bool {
        self.bot.set_web_enabled(enabled)
    }

    pub fn set_auto_learn(&mut self, enabled: bool) {
        self.bot.set_auto_learn(enabled);
    }

    pub fn save(&mut self) -> Result<(), PersistError> {
        self.bot.save_state()
    }

    pub fn bot(&self) -> &B {
        &self.bot
    }

    pub fn bot_mut(&mut self) -> &mut B {
        &mut self.bot
    }

    pub fn into_inner(self) -> B {
        self.bot
    }
}
