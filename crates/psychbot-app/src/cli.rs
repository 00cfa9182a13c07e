//! CLI argument definitions for the PsychBot console.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// PsychBot: clinic receptionist chatbot with appointment booking.
#[derive(Parser, Debug)]
#[command(name = "psychbot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Directory of .txt/.md clinic documents used to answer open questions.
    #[arg(short = 'd', long = "corpus")]
    pub corpus: Option<PathBuf>,

    /// Session id for this console conversation.
    #[arg(short = 's', long = "session", default_value = "console")]
    pub session: String,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PSYCHBOT_CONFIG env var > ~/.psychbot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        pick_config_path(
            self.config.clone(),
            std::env::var("PSYCHBOT_CONFIG").ok(),
            home_dir(),
        )
    }

    /// Resolve the log filter.
    ///
    /// Priority: --log-level flag > RUST_LOG env var > config file value > "info".
    pub fn resolve_log_filter(&self, config_level: &str) -> String {
        pick_log_filter(
            self.log_level.as_deref(),
            std::env::var("RUST_LOG").ok(),
            config_level,
        )
    }

    /// Resolve the document directory.
    ///
    /// Priority: --corpus flag > PSYCHBOT_CORPUS env var. `None` runs without
    /// retrieved passages.
    pub fn resolve_corpus_dir(&self) -> Option<PathBuf> {
        self.corpus
            .clone()
            .or_else(|| std::env::var("PSYCHBOT_CORPUS").ok().map(PathBuf::from))
    }
}

fn pick_config_path(flag: Option<PathBuf>, env: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(p) = flag {
        return p;
    }
    if let Some(p) = env.filter(|p| !p.is_empty()) {
        return PathBuf::from(p);
    }
    match home {
        Some(home) => home.join(".psychbot").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

fn pick_log_filter(flag: Option<&str>, env: Option<String>, config_level: &str) -> String {
    if let Some(level) = flag {
        return level.to_string();
    }
    if let Some(level) = env.filter(|l| !l.trim().is_empty()) {
        return level;
    }
    if !config_level.trim().is_empty() {
        return config_level.to_string();
    }
    "info".to_string()
}

/// Home directory for the current platform.
fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}
