pub mod capability;
pub mod config;
pub mod error;
pub mod guardrail;
pub mod text;
pub mod types;

pub use capability::bounded;
pub use config::PsychbotConfig;
pub use error::{Capability, CapabilityError, PsychbotError, Result};
pub use guardrail::{Classification, GuardrailClassifier};
pub use types::*;
