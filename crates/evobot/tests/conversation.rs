//! End-to-end tests for the bot: web gating, state files, training files and
//! sessions. Web access goes through a counting fake backend.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use evobot::{
    Bot, BotConfig, ChatBot, Mode, Reply, SearchBackend, SearchError, SearchHit, Session,
    SharedBot, Source, WebCapability, WebConfig, WebLookup,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Default)]
struct CountingBackend {
    calls: AtomicUsize,
    fail: bool,
    empty: bool,
}

impl CountingBackend {
    fn empty() -> Self {
        CountingBackend {
            empty: true,
            ..CountingBackend::default()
        }
    }

    fn failing() -> Self {
        CountingBackend {
            fail: true,
            ..CountingBackend::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchBackend for CountingBackend {
    fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SearchError::Backend("unavailable".into()));
        }
        if self.empty {
            return Ok(Vec::new());
        }
        Ok(vec![SearchHit {
            title: format!("Sobre {query}"),
            snippet: "Um resumo curto.".into(),
            url: "https://example.org/artigo".into(),
        }])
    }
}

fn rng() -> SmallRng {
    SmallRng::seed_from_u64(7)
}

fn web_bot(backend: &Arc<CountingBackend>, capability: WebCapability) -> Bot<SmallRng> {
    let web = WebLookup::new(Arc::clone(backend), capability, WebConfig::default());
    Bot::blank(BotConfig::default(), rng()).with_web(web)
}

// ---------------------------------------------------------------------------
// Web gating
// ---------------------------------------------------------------------------

#[test]
fn trigger_phrase_searches_once_then_hits_cache() {
    let backend = Arc::new(CountingBackend::default());
    let mut bot = web_bot(&backend, WebCapability::Online);

    let (reply, source) = bot.respond_with_source("o que é fotossíntese");
    assert_eq!(source, Source::Web);
    assert!(reply.starts_with("Encontrei algumas informações sobre 'o que é fotossíntese'"));
    assert_eq!(backend.calls(), 1);

    let record = bot.memory().iter().last().unwrap();
    assert_eq!(record.context_value("source"), Some("web_search"));
    assert!(record.context_value("timestamp").is_some());

    let (again, _) = bot.respond_with_source("O que é fotossíntese");
    assert_eq!(again, reply);
    assert_eq!(backend.calls(), 1);
}

#[test]
fn small_talk_never_searches() {
    let backend = Arc::new(CountingBackend::default());
    let mut bot = web_bot(&backend, WebCapability::Online);
    bot.respond("olá");
    bot.respond("como vai?");
    assert_eq!(backend.calls(), 0);
}

#[test]
fn unknown_question_of_three_words_searches() {
    let backend = Arc::new(CountingBackend::default());
    let mut bot = web_bot(&backend, WebCapability::Online);
    let (_, source) = bot.respond_with_source("quando começou a guerra");
    assert_eq!(source, Source::Web);
    assert_eq!(backend.calls(), 1);
}

#[test]
fn offline_bot_skips_the_web() {
    let backend = Arc::new(CountingBackend::default());
    let mut bot = web_bot(&backend, WebCapability::Offline);
    let (_, source) = bot.respond_with_source("o que é fotossíntese");
    assert_ne!(source, Source::Web);
    assert_eq!(backend.calls(), 0);
}

#[test]
fn disabled_web_is_not_consulted() {
    let backend = Arc::new(CountingBackend::default());
    let mut bot = web_bot(&backend, WebCapability::Online);
    bot.set_auto_learn(false);
    assert!(!bot.set_web_enabled(false));
    bot.respond("pesquise sobre vulcões");
    assert_eq!(backend.calls(), 0);

    assert!(bot.set_web_enabled(true));
    bot.respond("pesquise sobre vulcões");
    assert_eq!(backend.calls(), 1);
}

#[test]
fn failing_backend_falls_through() {
    let backend = Arc::new(CountingBackend::failing());
    let mut bot = web_bot(&backend, WebCapability::Online);
    let (reply, source) = bot.respond_with_source("o que é fotossíntese");
    assert_ne!(source, Source::Web);
    assert!(!reply.is_empty());
    assert_eq!(backend.calls(), 1);
}

#[test]
fn search_without_hits_falls_through() {
    let backend = Arc::new(CountingBackend::empty());
    let mut bot = web_bot(&backend, WebCapability::Online);
    bot.set_auto_learn(false);

    let (reply, source) = bot.respond_with_source("o que é fotossíntese");
    assert_ne!(source, Source::Web);
    assert_eq!(backend.calls(), 1);
    assert!(!reply.starts_with("Não foram encontradas"));
    assert!(bot.model().is_empty());
    assert!(
        bot.memory()
            .iter()
            .all(|r| r.context_value("source") != Some("web_search"))
    );

    let (later, _) = bot.respond_with_source("fotossíntese nas plantas");
    assert!(!later.starts_with("Não foram encontradas"));
}

// ---------------------------------------------------------------------------
// Knowledge
// ---------------------------------------------------------------------------

#[test]
fn fuzzy_lookup_uses_strict_threshold() {
    let mut bot = Bot::blank(BotConfig::default(), rng());
    bot.set_auto_learn(false);
    bot.teach("qual é seu nome", "X");

    let (reply, source) = bot.respond_with_source("qual é o seu nome");
    assert_eq!((reply.as_str(), source), ("X", Source::Knowledge));

    let (_, source) = bot.respond_with_source("qual é seu email");
    assert_ne!(source, Source::Knowledge);
}

#[test]
fn teaching_twice_keeps_one_copy() {
    let mut bot = Bot::blank(BotConfig::default(), rng());
    bot.teach("capital do japão", "Tóquio");
    bot.teach("Capital do Japão", "Tóquio");
    assert_eq!(bot.knowledge().exact("capital do japão").unwrap(), ["Tóquio"]);

    bot.teach("capital do japão", "A capital é Tóquio.");
    assert_eq!(bot.knowledge().exact("capital do japão").unwrap().len(), 2);
    let reply = bot.respond("capital do japão");
    assert!(reply == "Tóquio" || reply == "A capital é Tóquio.");
}

#[test]
fn training_file_teaches_every_pair() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("treino.tsv");
    fs::write(
        &path,
        "# perguntas de astronomia\n\
         qual o maior planeta\tJúpiter é o maior planeta.\n\
         linha sem tabulação\n\
         qual a estrela mais próxima\tO Sol.\n",
    )
    .unwrap();

    let mut bot = Bot::blank(BotConfig::default(), rng());
    assert_eq!(bot.train_from_file(&path).unwrap(), 2);
    assert_eq!(bot.respond("Qual o maior planeta"), "Júpiter é o maior planeta.");
    assert!(bot.model().successors("maior").is_some());

    assert!(bot.train_from_file(&dir.path().join("missing.tsv")).is_err());
}

// ---------------------------------------------------------------------------
// State files
// ---------------------------------------------------------------------------

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = BotConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..BotConfig::default()
    };

    {
        let mut bot = Bot::open(config.clone(), rng());
        assert!(bot.teach("cor favorita", "verde"));
        bot.respond("zebras listradas");
        bot.save_state().unwrap();
    }
    for name in ["knowledge.json", "memories.json", "language_model.json"] {
        assert!(dir.path().join(name).exists(), "{name} should exist");
    }

    let mut bot = Bot::open(config, rng());
    assert_eq!(bot.respond("Cor favorita"), "verde");
    assert!(bot.memory().iter().any(|r| r.input() == "zebras listradas"));
    assert_eq!(bot.knowledge().exact("Qual é seu nome?").unwrap().len(), 1);
}

#[test]
fn fresh_bot_ignores_saved_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = BotConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..BotConfig::default()
    };
    Bot::open(config.clone(), rng()).teach("cor favorita", "verde");

    let bot = Bot::fresh(config, rng());
    assert!(bot.knowledge().is_empty());
    assert!(bot.model().is_empty());
    assert_eq!(
        bot.state_paths().unwrap().knowledge,
        dir.path().join("knowledge.json")
    );
}

#[test]
fn broken_state_files_start_empty() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["knowledge.json", "memories.json", "language_model.json"] {
        fs::write(dir.path().join(name), "{ not json").unwrap();
    }
    let config = BotConfig {
        state_dir: Some(dir.path().to_path_buf()),
        ..BotConfig::default()
    };
    let mut bot = Bot::open(config, rng());
    assert!(bot.memory().is_empty());
    assert!(!bot.respond("qual é seu nome?").is_empty());
}

#[test]
fn search_cache_is_saved_with_state() {
    let dir = tempfile::tempdir().unwrap();
    let first = Arc::new(CountingBackend::default());
    let mut bot = Bot::blank(BotConfig::default(), rng())
        .with_state_dir(dir.path())
        .with_web(WebLookup::new(
            Arc::clone(&first),
            WebCapability::Online,
            WebConfig::default(),
        ));
    bot.respond("o que é fotossíntese");
    bot.save_state().unwrap();
    assert!(dir.path().join("web_cache.json").exists());

    let second = Arc::new(CountingBackend::default());
    let mut bot = Bot::blank(BotConfig::default(), rng())
        .with_state_dir(dir.path())
        .with_web(WebLookup::new(
            Arc::clone(&second),
            WebCapability::Online,
            WebConfig::default(),
        ));
    let (_, source) = bot.respond_with_source("o que é fotossíntese");
    assert_eq!(source, Source::Web);
    assert_eq!(second.calls(), 0);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[test]
fn session_over_shared_bot() {
    let shared = SharedBot::new(Bot::new(BotConfig::default(), rng()));
    let mut session = Session::new(shared.clone());

    session.toggle_training();
    session.handle("qual o melhor editor");
    assert_eq!(session.mode(), Mode::Training);
    session.handle("Aquele que você domina.");
    assert_eq!(session.mode(), Mode::Normal);

    let reply = shared
        .respond_in_background("Qual o melhor editor")
        .join()
        .unwrap();
    assert_eq!(reply, "Aquele que você domina.");

    assert_eq!(
        session.handle("qual o melhor editor"),
        Reply::Bot("Aquele que você domina.".into())
    );
    assert!(session.feedback(0.1).is_some());
    assert!(session.bot_mut().save_state().is_ok());
}
