use std::fmt;

use thiserror::Error;

/// Top-level error type for configuration and process-level failures.
///
/// Per-message failures never surface through this type: user input problems
/// are `ValidationError`s in the booking crate and external-service failures
/// are [`CapabilityError`]s, both of which are turned into replies.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PsychbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),
}

impl From<toml::de::Error> for PsychbotError {
    fn from(err: toml::de::Error) -> Self {
        PsychbotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PsychbotError {
    fn from(err: toml::ser::Error) -> Self {
        PsychbotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PsychbotError {
    fn from(err: serde_json::Error) -> Self {
        PsychbotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for PsychBot operations.
pub type Result<T> = std::result::Result<T, PsychbotError>;

/// External collaborators the engine calls out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    VectorSearch,
    Completion,
    Calendar,
    Email,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::VectorSearch => "vector search",
            Capability::Completion => "completion",
            Capability::Calendar => "calendar",
            Capability::Email => "email",
        };
        f.write_str(name)
    }
}

/// Failure of an external capability call.
///
/// Always recoverable: callers log it and degrade to a fallback reply or a
/// retryable prompt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("language model unavailable: {0}")]
    LlmUnavailable(String),

    #[error("calendar error: {0}")]
    Calendar(String),

    #[error("email error: {0}")]
    Email(String),

    #[error("{capability} call timed out after {after_ms} ms")]
    Timeout { capability: Capability, after_ms: u64 },
}

impl CapabilityError {
    /// The capability this failure came from.
    pub fn capability(&self) -> Capability {
        match self {
            CapabilityError::LlmUnavailable(_) => Capability::Completion,
            CapabilityError::Calendar(_) => Capability::Calendar,
            CapabilityError::Email(_) => Capability::Email,
            CapabilityError::Timeout { capability, .. } => *capability,
        }
    }
}
