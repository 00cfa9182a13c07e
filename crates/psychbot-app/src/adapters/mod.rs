//! Reference capability adapters used by the interactive binary.

pub mod calendar;
pub mod corpus;
pub mod mailer;
pub mod ollama;

pub use calendar::InMemoryCalendar;
pub use corpus::CorpusIndex;
pub use mailer::LogMailer;
pub use ollama::OllamaCompletion;
