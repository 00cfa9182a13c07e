//! Quick-response cache for the clinic's most common questions.
//!
//! A fixed table of keyword phrases maps to canned answers rendered from
//! clinic configuration. Lookup scores every phrase against the normalized
//! message and returns the best answer above the confidence threshold, so
//! frequent questions never reach the language model.

use psychbot_booking::OperatingHours;
use psychbot_core::config::{ClinicConfig, QuickResponseConfig};
use psychbot_core::text::{join_and, normalize};
use psychbot_core::types::ServiceKind;

/// Words ignored when counting the content tokens of a message.
const STOP_WORDS: &[&str] = &[
    "a", "about", "am", "an", "and", "any", "are", "at", "be", "can", "could", "do", "does",
    "for", "have", "has", "how", "i", "in", "is", "it", "its", "me", "my", "of", "on", "or",
    "our", "please", "tell", "that", "the", "there", "this", "to", "us", "was", "we", "what",
    "whats", "when", "which", "will", "with", "would", "you", "your",
];

/// Entry keys, in table order. Also the keys accepted in
/// `quick_responses.overrides`.
pub const ENTRY_KEYS: [&str; 7] = [
    "services",
    "pricing",
    "hours",
    "location",
    "languages",
    "contact",
    "greeting",
];

/// Entries that only answer a message made up entirely of their own words,
/// so "Hi, do you treat insomnia?" is not taken for a greeting.
const WHOLE_MESSAGE_KEYS: &[&str] = &["greeting"];

fn phrases_for(key: &str) -> &'static [&'static str] {
    match key {
        "services" => &[
            "services",
            "what services do you offer",
            "what do you offer",
            "types of therapy",
            "therapy options",
            "kinds of therapy",
            "treatments",
        ],
        "pricing" => &[
            "price",
            "pricing",
            "cost",
            "how much",
            "how much does it cost",
            "fees",
            "session fee",
            "rates",
            "charges",
        ],
        "hours" => &[
            "hours",
            "opening hours",
            "operating hours",
            "business hours",
            "when are you open",
            "open",
            "what time",
        ],
        "location" => &[
            "location",
            "address",
            "where are you",
            "where is the clinic",
            "where are you located",
            "located",
            "directions",
        ],
        "languages" => &[
            "languages",
            "language",
            "what languages do you speak",
            "speak",
            "mandarin",
            "chinese",
        ],
        "contact" => &[
            "phone",
            "phone number",
            "contact",
            "contact number",
            "call you",
            "reach you",
        ],
        "greeting" => &[
            "hello",
            "hi",
            "hey",
            "good morning",
            "good afternoon",
            "good evening",
        ],
        _ => &[],
    }
}

/// Strip a plural `s` so "hours" and "hour" compare equal. Leaves short
/// words and `ss` endings ("address") alone.
fn stem(token: &str) -> &str {
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        &token[..token.len() - 1]
    } else {
        token
    }
}

fn content_tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split(' ')
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(stem)
        .collect()
}

// =============================================================================
// Entries
// =============================================================================

#[derive(Debug, Clone)]
struct Pattern {
    /// Normalized phrase, used for the exact-match test.
    text: String,
    /// Stemmed content tokens of the phrase.
    tokens: Vec<String>,
}

#[derive(Debug, Clone)]
struct QuickEntry {
    key: &'static str,
    patterns: Vec<Pattern>,
    answer: String,
    whole_message: bool,
}

impl QuickEntry {
    /// Every content token of the message appears in one of this entry's phrases.
    fn covers(&self, content: &[&str]) -> bool {
        content
            .iter()
            .all(|t| self.patterns.iter().any(|p| p.tokens.iter().any(|pt| pt == t)))
    }
}

/// Best-scoring entry for a message.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickMatch<'a> {
    pub key: &'static str,
    pub answer: &'a str,
    pub score: f32,
}

/// Immutable phrase table built once at startup.
#[derive(Debug, Clone)]
pub struct QuickResponseCache {
    entries: Vec<QuickEntry>,
    min_confidence: f32,
    enabled: bool,
}

impl QuickResponseCache {
    pub fn new(
        config: &QuickResponseConfig,
        clinic: &ClinicConfig,
        hours: &OperatingHours,
    ) -> Self {
        let entries = ENTRY_KEYS
            .iter()
            .map(|&key| {
                let answer = config
                    .overrides
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| default_answer(key, clinic, hours));
                let patterns = phrases_for(key)
                    .iter()
                    .map(|phrase| {
                        let text = normalize(phrase);
                        let tokens = content_tokens(&text)
                            .into_iter()
                            .map(str::to_string)
                            .collect();
                        Pattern { text, tokens }
                    })
                    .collect();
                QuickEntry {
                    key,
                    patterns,
                    answer,
                    whole_message: WHOLE_MESSAGE_KEYS.contains(&key),
                }
            })
            .collect();

        for key in config.overrides.keys() {
            if !ENTRY_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "Ignoring quick-response override for unknown entry");
            }
        }

        Self {
            entries,
            min_confidence: config.min_confidence,
            enabled: config.enabled,
        }
    }

    /// Canned answer for `message`, if one scores at or above the threshold.
    pub fn lookup(&self, message: &str) -> Option<String> {
        self.best_match(message).map(|m| m.answer.to_string())
    }

    /// Highest-scoring entry at or above the threshold. Ties go to the
    /// phrase with more tokens, then the longer phrase.
    pub fn best_match(&self, message: &str) -> Option<QuickMatch<'_>> {
        if !self.enabled {
            return None;
        }
        let normalized = normalize(message);
        if normalized.is_empty() {
            return None;
        }
        let content = content_tokens(&normalized);

        let mut best: Option<(f32, usize, usize, &QuickEntry)> = None;
        for entry in &self.entries {
            if entry.whole_message && !entry.covers(&content) {
                continue;
            }
            for pattern in &entry.patterns {
                let Some(score) = pattern_score(pattern, &normalized, &content) else {
                    continue;
                };
                let rank = (score, pattern.tokens.len(), pattern.text.len(), entry);
                let better = match &best {
                    None => true,
                    Some((s, t, l, _)) => {
                        score > *s
                            || (score == *s && (rank.1, rank.2) > (*t, *l))
                    }
                };
                if better {
                    best = Some(rank);
                }
            }
        }

        let (score, _, _, entry) = best?;
        if score < self.min_confidence {
            tracing::debug!(best = entry.key, score, "Quick response below threshold");
            return None;
        }
        Some(QuickMatch {
            key: entry.key,
            answer: &entry.answer,
            score,
        })
    }
}

/// 1.0 for an exact phrase match; otherwise, when every phrase token is
/// present, `0.5 + 0.5 * phrase_tokens / content_tokens`.
fn pattern_score(pattern: &Pattern, normalized: &str, content: &[&str]) -> Option<f32> {
    if pattern.text == normalized {
        return Some(1.0);
    }
    if pattern.tokens.is_empty() || content.is_empty() {
        return None;
    }
    if !pattern.tokens.iter().all(|t| content.contains(&t.as_str())) {
        return None;
    }
    let ratio = pattern.tokens.len() as f32 / content.len() as f32;
    Some(0.5 + 0.5 * ratio.min(1.0))
}

fn default_answer(key: &str, clinic: &ClinicConfig, hours: &OperatingHours) -> String {
    match key {
        "services" => {
            let labels: Vec<&str> = ServiceKind::ALL.iter().map(|s| s.label()).collect();
            format!(
                "We offer {} therapy. Session fees: {}. Would you like to book an appointment?",
                join_and(&labels),
                ServiceKind::price_list()
            )
        }
        "pricing" => format!(
            "Our session fees are: {}. Would you like to book an appointment?",
            ServiceKind::price_list()
        ),
        "hours" => format!(
            "We're open {}. Would you like to book an appointment?",
            hours.summary()
        ),
        "location" => format!(
            "{} is at {}. You can reach us on {}.",
            clinic.name, clinic.address, clinic.phone
        ),
        "languages" => format!(
            "Sessions are available in {}.",
            join_and(&clinic.languages)
        ),
        "contact" => format!(
            "You can call {} on {}, or I can help you book an appointment right here.",
            clinic.name, clinic.phone
        ),
        "greeting" => format!(
            "Hello! I'm {}, the assistant for {}. I can answer questions about our services, \
             fees and opening hours, or help you book an appointment.",
            clinic.assistant_name, clinic.name
        ),
        _ => String::new(),
    }
}
