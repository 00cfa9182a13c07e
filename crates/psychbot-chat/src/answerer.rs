//! Retrieval-augmented answers for questions the quick-response table
//! does not cover.
//!
//! One answer is one vector search plus exactly one bounded completion call.
//! The raw completion is cleaned of leaked turn markers, role labels and
//! special tokens, then capped on a word boundary. Any capability failure
//! degrades to a fixed fallback reply.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use psychbot_booking::OperatingHours;
use psychbot_core::capability::bounded;
use psychbot_core::config::{ClinicConfig, LlmConfig, RetrievalConfig};
use psychbot_core::error::{Capability, CapabilityError};
use psychbot_core::types::{ServiceKind, Turn};
use regex::Regex;

static SPECIAL_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\|[^|>]*\|>|</?s>|\[/?INST\]|<</?SYS>>").expect("Invalid special token regex")
});

static LEADING_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\s*(?:a|answer|assistant|response)\s*:)+\s*")
        .expect("Invalid leading label regex")
});

static TURN_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:q|question|user|human|patient)\s*:")
        .expect("Invalid turn marker regex")
});

// =============================================================================
// Capabilities
// =============================================================================

/// A retrieved chunk of clinic documentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub text: String,
    /// Similarity to the query; higher is more relevant.
    pub score: f32,
}

impl Passage {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// Nearest-neighbour search over the clinic document index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` passages for `query`. An index failure is an empty result.
    async fn search(&self, query: &str, k: usize) -> Vec<Passage>;
}

/// Text completion from a language model.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, CapabilityError>;
}

// =============================================================================
// RagAnswerer
// =============================================================================

pub struct RagAnswerer {
    index: Arc<dyn VectorIndex>,
    completion: Arc<dyn CompletionService>,
    retrieval: RetrievalConfig,
    llm: LlmConfig,
    instruction: String,
    fallback: String,
    phone: String,
}

impl RagAnswerer {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionService>,
        retrieval: &RetrievalConfig,
        llm: &LlmConfig,
        clinic: &ClinicConfig,
        hours: &OperatingHours,
    ) -> Self {
        let instruction = format!(
            "You are {assistant}, the receptionist assistant for {clinic}, a psychotherapy clinic. \
             Only answer questions about the clinic: its services, fees, opening hours, location \
             and appointments. Use the clinic information below. If the answer is not there, say \
             you are not sure and suggest calling {phone}. Never give a diagnosis or medical \
             advice. Reply in under 40 words.\n\
             Clinic facts: fees per session: {prices}. Hours: {hours}. Address: {address}. \
             Phone: {phone}.",
            assistant = clinic.assistant_name,
            clinic = clinic.name,
            phone = clinic.phone,
            prices = ServiceKind::price_list(),
            hours = hours.summary(),
            address = clinic.address,
        );
        let fallback = format!(
            "I'm having trouble answering right now. Would you like to book an appointment or \
             call the clinic directly? You can reach us on {}.",
            clinic.phone
        );
        Self {
            index,
            completion,
            retrieval: retrieval.clone(),
            llm: llm.clone(),
            instruction,
            fallback,
            phone: clinic.phone.clone(),
        }
    }

    /// Reply used whenever retrieval or completion cannot produce an answer.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Answer `question` given the conversation so far (oldest first,
    /// excluding the question itself).
    pub async fn answer(&self, question: &str, history: &[Turn]) -> String {
        let k = self.retrieval.top_k;
        let passages = match bounded(Capability::VectorSearch, self.llm.timeout(), async {
            Ok(self.index.search(question, k).await)
        })
        .await
        {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!(error = %e, "Vector search failed, answering without passages");
                Vec::new()
            }
        };
        let passages = rank(passages, k);
        tracing::debug!(passages = passages.len(), "Retrieved passages");

        let prompt = self.build_prompt(question, &passages, history);
        let raw = match bounded(
            Capability::Completion,
            self.llm.timeout(),
            self.completion
                .complete(&prompt, self.llm.max_tokens, self.llm.temperature),
        )
        .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Completion failed, using fallback reply");
                return self.fallback.clone();
            }
        };

        let cleaned = self.post_process(&raw);
        if cleaned.is_empty() {
            tracing::warn!("Completion was empty after cleanup, using fallback reply");
            return self.fallback.clone();
        }
        cleaned
    }

    /// Instruction, passages within the character budget, recent history,
    /// then the question.
    pub fn build_prompt(&self, question: &str, passages: &[Passage], history: &[Turn]) -> String {
        let mut prompt = String::with_capacity(self.instruction.len() + 1024);
        prompt.push_str(&self.instruction);
        prompt.push_str("\n\nClinic information:\n");

        let mut budget = self.retrieval.max_passage_chars;
        let mut included = 0;
        for passage in passages {
            let len = passage.text.chars().count();
            let text = if len <= budget {
                passage.text.as_str()
            } else if included == 0 {
                // The best passage is always used, cut to the budget.
                truncate_chars(&passage.text, budget)
            } else {
                break;
            };
            if text.is_empty() {
                break;
            }
            included += 1;
            budget -= text.chars().count();
            prompt.push_str(&format!("[{}] {}\n", included, text.trim()));
        }
        if included == 0 {
            prompt.push_str("(none found)\n");
        }

        let recent = &history[history.len().saturating_sub(self.retrieval.history_turns)..];
        if !recent.is_empty() {
            prompt.push_str("\nConversation so far:\n");
            for turn in recent {
                prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
            }
        }

        prompt.push_str(&format!("\nUser: {}\nAssistant:", question.trim()));
        prompt
    }

    /// Clean a raw completion into a reply. Returns an empty string when
    /// nothing usable is left.
    pub fn post_process(&self, raw: &str) -> String {
        let text = SPECIAL_TOKENS.replace_all(raw, " ");
        let text = LEADING_LABEL.replace(&text, "");
        let text = match TURN_MARKER.find(&text) {
            Some(m) => &text[..m.start()],
            None => &text[..],
        };
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.cap_length(&text)
    }

    fn cap_length(&self, text: &str) -> String {
        let cap = self.retrieval.max_answer_chars;
        if text.chars().count() <= cap {
            return text.to_string();
        }
        let head = truncate_chars(text, cap);
        let head = match head.rfind(' ') {
            Some(idx) if idx > 0 => &head[..idx],
            _ => head,
        };
        let head = head.trim_end_matches([',', ';', ':', '-', ' ']);
        format!("{}... For more details, please call us on {}.", head, self.phone)
    }
}

/// Sort by descending score and keep the best `k`.
fn rank(mut passages: Vec<Passage>, k: usize) -> Vec<Passage> {
    passages.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    passages.truncate(k);
    passages
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
