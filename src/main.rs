//! evobot CLI: interactive terminal chat with a self-evolving assistant.
//!
//! Thin wrapper over the `evobot` library crate.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use evobot::{Bot, BotConfig, Reply, Session, WebLookup};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const GREETING: &str =
    "Olá! Sou o Self-Evolving Bot, um assistente virtual que aprende com nossas conversas.";

const HELP: &str = "Comandos: /train, /good, /bad, /web on|off, /auto on|off, /save, sair";

/// evobot, a Portuguese chat assistant that learns from every conversation.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// PRNG seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the saved state files (overrides the config).
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Never search the web.
    #[arg(long)]
    no_web: bool,

    /// Only learn from /train and positive feedback.
    #[arg(long)]
    no_auto_learn: bool,

    /// Training file: one `question<TAB>answer` pair per line.
    #[arg(long)]
    train: Option<PathBuf>,

    /// Start empty: ignore saved state and skip the built-in knowledge.
    #[arg(long)]
    fresh: bool,
}

/// One line of REPL input.
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Quit,
    Train,
    Feedback(f64),
    Web(bool),
    Auto(bool),
    Save,
    Usage,
    Say(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let lowered: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
    let words: Vec<&str> = lowered.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["quit" | "exit" | "sair"] => Command::Quit,
        ["/train"] => Command::Train,
        ["/good"] => Command::Feedback(1.0),
        ["/bad"] => Command::Feedback(0.0),
        ["/web", "on"] => Command::Web(true),
        ["/web", "off"] => Command::Web(false),
        ["/auto", "on"] => Command::Auto(true),
        ["/auto", "off"] => Command::Auto(false),
        ["/save"] => Command::Save,
        [cmd, ..] if cmd.starts_with('/') => Command::Usage,
        _ => Command::Say(line),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "ativada" } else { "desativada" }
}

fn build_bot(args: &Args) -> Result<Bot<SmallRng>> {
    let mut config = match &args.config {
        Some(path) => BotConfig::from_toml_file(path)?,
        None => BotConfig::default(),
    };
    if let Some(dir) = &args.state_dir {
        config.state_dir = Some(dir.clone());
    }
    if args.no_web {
        config.web.enabled = false;
    }
    if args.no_auto_learn {
        config.auto_learn = false;
    }

    let rng = args
        .seed
        .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
    let web = config.web.clone();
    let mut bot = if args.fresh {
        Bot::fresh(config, rng)
    } else {
        Bot::open(config, rng)
    };

    if web.enabled {
        match WebLookup::connect(web) {
            Ok(lookup) => bot = bot.with_web(lookup),
            Err(e) => warn!(error = %e, "web search unavailable"),
        }
    }
    Ok(bot)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut bot = build_bot(&args)?;

    if let Some(path) = &args.train {
        eprintln!("Treinando a partir de {}...", path.display());
        let taught = bot
            .train_from_file(path)
            .with_context(|| format!("cannot read training file {}", path.display()))?;
        eprintln!("Treinamento concluído: {taught} pares aprendidos.");
    }

    let mut session = Session::new(bot);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    writeln!(stdout, "Bot: {GREETING}")?;
    writeln!(stdout, "{HELP}")?;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let reply = match parse_command(trimmed) {
            Command::Quit => break,
            Command::Train => session.toggle_training(),
            Command::Feedback(score) => Reply::System(
                session
                    .feedback(score)
                    .unwrap_or_else(|| "Ainda não há resposta para avaliar.".to_string()),
            ),
            Command::Web(on) => {
                let enabled = session.set_web_enabled(on);
                Reply::System(format!("Busca na web {}.", on_off(enabled)))
            }
            Command::Auto(on) => {
                session.set_auto_learn(on);
                Reply::System(format!("Aprendizado automático {}.", on_off(on)))
            }
            Command::Save => match session.save() {
                Ok(()) => Reply::System("Estado salvo com sucesso!".to_string()),
                Err(e) => Reply::System(format!("Falha ao salvar: {e}")),
            },
            Command::Usage => Reply::System(HELP.to_string()),
            Command::Say(text) => session.handle(text),
        };

        match reply {
            Reply::Bot(text) => writeln!(stdout, "Bot: {text}")?,
            Reply::System(text) => writeln!(stdout, "[{text}]")?,
        }
        stdout.flush()?;
    }

    if let Err(e) = session.save() {
        warn!(error = %e, "state not saved on exit");
    }
    writeln!(stdout, "Até logo!")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert_eq!(parse_command("SAIR"), Command::Quit);
        assert_eq!(parse_command("/train"), Command::Train);
        assert_eq!(parse_command("/good"), Command::Feedback(1.0));
        assert_eq!(parse_command("/web off"), Command::Web(false));
        assert_eq!(parse_command("/auto ON"), Command::Auto(true));
        assert_eq!(parse_command("/web"), Command::Usage);
        assert_eq!(parse_command("/nada"), Command::Usage);
        assert_eq!(parse_command("olá bot"), Command::Say("olá bot"));
        assert_eq!(parse_command("sair de casa"), Command::Say("sair de casa"));
    }
}
