//! Guardrail classifier for inbound messages.
//!
//! Screens every message before routing. Self-harm language always wins and
//! yields a crisis reply; questions about other patients are refused; chatter
//! about unrelated domains is redirected back to the clinic's services.
//!
//! Built-in lists are compiled once; operators can append phrases through
//! [`GuardrailConfig`]. The classifier is immutable after construction.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{ClinicConfig, GuardrailConfig};
use crate::text::{contains_phrase, join_and, normalize};
use crate::types::ServiceKind;

/// Outcome of screening one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Safe,
    /// Carries the crisis-support reply.
    SelfHarm(String),
    /// Carries the redirect reply.
    OffTopic(String),
    /// Carries the refusal reply.
    PrivacySensitive(String),
}

impl Classification {
    /// Canned reply, if the message should not be routed further.
    pub fn message(&self) -> Option<&str> {
        match self {
            Classification::Safe => None,
            Classification::SelfHarm(m)
            | Classification::OffTopic(m)
            | Classification::PrivacySensitive(m) => Some(m),
        }
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Safe => "safe",
            Classification::SelfHarm(_) => "self_harm",
            Classification::OffTopic(_) => "off_topic",
            Classification::PrivacySensitive(_) => "privacy_sensitive",
        }
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, Classification::Safe)
    }
}

// =============================================================================
// Built-in lists
// =============================================================================

/// Matched against normalized text, so hyphens are already spaces and
/// apostrophes are gone.
static SELF_HARM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bsuicid(?:e|es|al|ality)\b",
        r"\bkill(?:s|ing|ed)?\s+my\s?self\b",
        r"\bend(?:s|ing|ed)?\s+my\s+(?:own\s+)?life\b",
        r"\bend(?:ing)?\s+it\s+all\b",
        r"\btak(?:e|es|ing)\s+my\s+(?:own\s+)?life\b",
        r"\b(?:hurt(?:s|ing)?|harm(?:s|ing|ed)?|cut(?:s|ting)?|injur(?:e|es|ing|ed))\s+my\s?self\b",
        r"\bself\s?harm(?:s|ing|ed)?\b",
        r"\b(?:want|wants|wanted|wanting|wanna)\s+(?:to\s+)?die\b",
        r"\bbetter\s+off\s+dead\b",
        r"\bno\s+reason\s+to\s+live\b",
        r"\bdont\s+want\s+to\s+(?:live|be\s+alive|wake\s+up)\b",
        r"\boverdos(?:e|es|ing|ed)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid self-harm regex"))
    .collect()
});

const OFF_TOPIC_TERMS: &[&str] = &[
    "weather",
    "forecast",
    "football",
    "soccer",
    "basketball",
    "tennis",
    "nba",
    "premier league",
    "world cup",
    "stock",
    "stocks",
    "stock market",
    "crypto",
    "cryptocurrency",
    "bitcoin",
    "ethereum",
    "forex",
    "investing",
    "recipe",
    "recipes",
    "cooking",
    "bake",
    "baking",
    "python",
    "javascript",
    "coding",
    "programming",
    "source code",
    "election",
    "politics",
    "president",
    "prime minister",
    "movie",
    "movies",
    "netflix",
    "celebrity",
    "lottery",
    "video game",
    "video games",
];

/// Any of these marks a message as clinic-related, which suppresses the
/// off-topic redirect.
const CLINIC_TERMS: &[&str] = &[
    "therapy",
    "therapist",
    "counselling",
    "counseling",
    "counsellor",
    "counselor",
    "psychologist",
    "psychiatrist",
    "psychotherapy",
    "session",
    "sessions",
    "appointment",
    "book",
    "booking",
    "clinic",
    "doctor",
    "dr",
    "price",
    "prices",
    "cost",
    "fee",
    "fees",
    "hours",
    "open",
    "service",
    "services",
    "anxiety",
    "anxious",
    "depression",
    "depressed",
    "stress",
    "stressed",
    "mental",
    "mood",
    "sleep",
    "panic",
    "trauma",
    "grief",
    "worry",
    "feel",
    "feeling",
    "relationship",
];

const PRIVACY_PHRASES: &[&str] = &[
    "other patients",
    "other patient",
    "another patient",
    "other clients",
    "another client",
    "patient records",
    "patient record",
    "patient list",
    "patient files",
    "patient data",
    "client list",
    "client records",
    "medical records of",
    "someone else's",
    "somebody else's",
    "internal records",
    "staff records",
    "who else sees",
    "who else is seeing",
    "is my friend a patient",
    "is my wife a patient",
    "is my husband a patient",
];

// =============================================================================
// Classifier
// =============================================================================

/// Compiled guardrail lists plus the canned replies rendered from clinic
/// configuration.
#[derive(Debug, Clone)]
pub struct GuardrailClassifier {
    extra_self_harm: Vec<String>,
    off_topic: Vec<String>,
    clinic_terms: Vec<String>,
    privacy: Vec<String>,
    crisis_message: String,
    redirect_message: String,
    privacy_message: String,
}

impl GuardrailClassifier {
    pub fn new(config: &GuardrailConfig, clinic: &ClinicConfig) -> Self {
        let normalized = |builtin: &[&str], extra: &[String]| -> Vec<String> {
            builtin
                .iter()
                .copied()
                .chain(extra.iter().map(String::as_str))
                .map(normalize)
                .filter(|p| !p.is_empty())
                .collect()
        };

        Self {
            extra_self_harm: normalized(&[], &config.extra_self_harm_phrases),
            off_topic: normalized(OFF_TOPIC_TERMS, &config.extra_off_topic_terms),
            clinic_terms: normalized(CLINIC_TERMS, &[]),
            privacy: normalized(PRIVACY_PHRASES, &config.extra_privacy_phrases),
            crisis_message: crisis_message(clinic),
            redirect_message: redirect_message(clinic),
            privacy_message: privacy_message(clinic),
        }
    }

    /// Classify one message. Never fails; empty input is [`Classification::Safe`].
    pub fn classify(&self, message: &str) -> Classification {
        let text = normalize(message);
        if text.is_empty() {
            return Classification::Safe;
        }

        if self.is_self_harm(&text) {
            return Classification::SelfHarm(self.crisis_message.clone());
        }

        if self.privacy.iter().any(|p| contains_phrase(&text, p)) {
            return Classification::PrivacySensitive(self.privacy_message.clone());
        }

        let unrelated = self.off_topic.iter().any(|t| contains_phrase(&text, t));
        if unrelated && !self.clinic_terms.iter().any(|t| contains_phrase(&text, t)) {
            return Classification::OffTopic(self.redirect_message.clone());
        }

        Classification::Safe
    }

    fn is_self_harm(&self, text: &str) -> bool {
        SELF_HARM_PATTERNS.iter().any(|re| re.is_match(text))
            || self.extra_self_harm.iter().any(|p| contains_phrase(text, p))
    }
}

impl Default for GuardrailClassifier {
    fn default() -> Self {
        Self::new(&GuardrailConfig::default(), &ClinicConfig::default())
    }
}

fn crisis_message(clinic: &ClinicConfig) -> String {
    format!(
        "I'm really sorry you're feeling this way, and I'm glad you reached out. \
         You don't have to go through this alone. Please call {} any time, day or night, \
         or {} if you are in immediate danger. When you feel ready, I can also help you \
         book a session with {}.",
        clinic.crisis_line, clinic.emergency_number, clinic.name
    )
}

fn redirect_message(clinic: &ClinicConfig) -> String {
    let labels: Vec<&str> = ServiceKind::ALL.iter().map(|s| s.label()).collect();
    let services = join_and(&labels);
    format!(
        "I can only help with questions about {} and booking appointments. \
         We offer {} therapy. What would you like to know?",
        clinic.name, services
    )
}

fn privacy_message(clinic: &ClinicConfig) -> String {
    format!(
        "I'm sorry, I can't share any information about other patients or internal records. \
         All patient information is kept strictly confidential. For questions about your own \
         care, please call {}.",
        clinic.phone
    )
}
