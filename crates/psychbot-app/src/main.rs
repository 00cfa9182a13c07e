//! PsychBot console binary: composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the capability adapters (Ollama, document corpus, calendar, mail log)
//! 4. Run a line-oriented chat loop on stdin/stdout, sweeping idle sessions
//!    in the background

mod adapters;
mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use psychbot_chat::{Capabilities, ChatOrchestrator};
use psychbot_core::config::PsychbotConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

use adapters::{CorpusIndex, InMemoryCalendar, LogMailer, OllamaCompletion};
use cli::CliArgs;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const HELP: &str = "Commands: /history, /state, /reset, /quit";

/// Sweep idle sessions on a fixed interval.
async fn sweep_loop(orchestrator: Arc<ChatOrchestrator>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let removed = orchestrator.sweep_expired();
        if removed > 0 {
            tracing::debug!(removed, "Idle sessions swept");
        }
    }
}

/// Handle a console command. Returns false when the loop should stop.
async fn run_command(orchestrator: &ChatOrchestrator, session: &str, command: &str) -> bool {
    match command {
        "/quit" | "/exit" => return false,
        "/history" => match orchestrator.history(session).await {
            Ok(turns) => {
                for turn in turns {
                    println!("{}: {}", turn.role, turn.content);
                }
            }
            Err(e) => println!("({e})"),
        },
        "/state" => match orchestrator.booking_state(session).await {
            Ok(state) => println!("booking state: {state}"),
            Err(e) => println!("({e})"),
        },
        "/reset" => match orchestrator.end_session(session) {
            Ok(()) => println!("(session cleared)"),
            Err(e) => println!("({e})"),
        },
        _ => println!("{HELP}"),
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = PsychbotConfig::load_or_default(&config_file);

    // Tracing goes to stderr so the conversation stays readable on stdout.
    let filter = args.resolve_log_filter(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting PsychBot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Capabilities.
    let index = match args.resolve_corpus_dir() {
        Some(dir) => CorpusIndex::load(&dir)?,
        None => {
            tracing::warn!("No document corpus configured; open questions get no passages");
            CorpusIndex::default()
        }
    };
    let completion = OllamaCompletion::new(&config.llm)?;
    tracing::info!(endpoint = %config.llm.endpoint, model = %config.llm.model, "Completion endpoint");

    let orchestrator = Arc::new(ChatOrchestrator::new(
        &config,
        Capabilities {
            index: Arc::new(index),
            completion: Arc::new(completion),
            calendar: Arc::new(InMemoryCalendar::new()),
            email: Arc::new(LogMailer),
        },
    ));

    let sweeper = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        sweep_loop(sweeper).await;
    });

    // === Chat loop ===

    println!(
        "{} at {}. Type a message, or {}",
        config.clinic.assistant_name, config.clinic.name, HELP
    );

    let session = args.session.as_str();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.starts_with('/') {
            if !run_command(&orchestrator, session, line).await {
                break;
            }
            continue;
        }
        let reply = orchestrator.handle(session, line).await;
        println!("{}: {}", config.clinic.assistant_name, reply);
    }

    tracing::info!("PsychBot stopped");
    Ok(())
}
