use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PsychbotError, Result};

/// Top-level configuration for PsychBot.
///
/// Loaded from `~/.psychbot/config.toml` by default. Every section falls back
/// to its defaults when absent, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PsychbotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub clinic: ClinicConfig,
    #[serde(default)]
    pub guardrail: GuardrailConfig,
    #[serde(default)]
    pub quick_responses: QuickResponseConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl PsychbotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PsychbotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PsychbotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Facts about the clinic that appear in replies and prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// Clinic display name.
    pub name: String,
    /// Name the assistant introduces itself with.
    pub assistant_name: String,
    /// Front-desk phone number.
    pub phone: String,
    /// Street address.
    pub address: String,
    /// Crisis hotline shown on self-harm messages.
    pub crisis_line: String,
    /// Emergency services number.
    pub emergency_number: String,
    /// Languages sessions can be held in.
    pub languages: Vec<String>,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            name: "Dr. Sarah Tan's Clinic".to_string(),
            assistant_name: "PsychBot".to_string(),
            phone: "+65 6311 2330".to_string(),
            address: "Level 8, Raffles Specialist Centre, 585 North Bridge Road, Singapore 188770"
                .to_string(),
            crisis_line: "1800-221-4444 (SOS, Singapore)".to_string(),
            emergency_number: "995".to_string(),
            languages: vec!["English".to_string(), "Mandarin".to_string()],
        }
    }
}

/// Extra phrases appended to the built-in guardrail lists.
///
/// Matching is case-insensitive substring matching after normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub extra_self_harm_phrases: Vec<String>,
    pub extra_off_topic_terms: Vec<String>,
    pub extra_privacy_phrases: Vec<String>,
}

/// Quick-response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickResponseConfig {
    pub enabled: bool,
    /// Minimum match score (0.0 to 1.0) for a cached answer to be used.
    pub min_confidence: f32,
    /// Answer overrides keyed by entry name (services, pricing, hours,
    /// location, languages, contact, greeting).
    pub overrides: BTreeMap<String, String>,
}

impl Default for QuickResponseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.6,
            overrides: BTreeMap::new(),
        }
    }
}

/// Retrieval-augmented answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages requested from the vector index.
    pub top_k: usize,
    /// Number of most recent turns included in the prompt.
    pub history_turns: usize,
    /// Character budget for retrieved passages in the prompt.
    pub max_passage_chars: usize,
    /// Character cap applied to the generated answer.
    pub max_answer_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            history_turns: 4,
            max_passage_chars: 1500,
            max_answer_chars: 300,
        }
    }
}

/// Language-model completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the completion endpoint.
    pub endpoint: String,
    /// Model name passed to the endpoint.
    pub model: String,
    pub temperature: f32,
    /// Hard cap on generated tokens.
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3:8b".to_string(),
            temperature: 0.1,
            max_tokens: 80,
            timeout_secs: 20,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Booking flow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Length of one appointment in minutes.
    pub session_minutes: u32,
    pub calendar_timeout_secs: u64,
    pub email_timeout_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            session_minutes: 50,
            calendar_timeout_secs: 10,
            email_timeout_secs: 10,
        }
    }
}

impl BookingConfig {
    pub fn calendar_timeout(&self) -> Duration {
        Duration::from_secs(self.calendar_timeout_secs)
    }

    pub fn email_timeout(&self) -> Duration {
        Duration::from_secs(self.email_timeout_secs)
    }
}

/// Session store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle minutes after which a session is swept.
    pub timeout_minutes: u32,
    /// Longer inbound messages are truncated to this many characters.
    pub max_message_chars: usize,
    /// Oldest turns are dropped beyond this many.
    pub max_stored_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 30,
            max_message_chars: 2000,
            max_stored_turns: 200,
        }
    }
}
