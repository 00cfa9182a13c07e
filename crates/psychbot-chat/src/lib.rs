//! Conversational front end for PsychBot.
//!
//! Owns chat sessions and routes each message through the guardrail
//! classifier, the booking flow, the quick-response cache and the
//! retrieval-augmented answerer.

pub mod answerer;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod quick;

pub use answerer::{CompletionService, Passage, RagAnswerer, VectorIndex};
pub use context::{Session, SessionStore};
pub use error::ChatError;
pub use orchestrator::{Capabilities, ChatOrchestrator, Reply, Route};
pub use quick::QuickResponseCache;
