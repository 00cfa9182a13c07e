use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// =============================================================================
// Conversation
// =============================================================================

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("User"),
            Role::Assistant => f.write_str("Assistant"),
        }
    }
}

/// One message in a session's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Local>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            at: Local::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            at: Local::now(),
        }
    }
}

// =============================================================================
// Services
// =============================================================================

/// Therapy services the clinic offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Individual,
    Couples,
    Family,
    Group,
    Online,
}

impl ServiceKind {
    /// All services in display order.
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::Individual,
        ServiceKind::Couples,
        ServiceKind::Family,
        ServiceKind::Group,
        ServiceKind::Online,
    ];

    /// Session fee in whole Singapore dollars.
    pub fn price_sgd(&self) -> u32 {
        match self {
            ServiceKind::Individual => 120,
            ServiceKind::Couples => 180,
            ServiceKind::Family => 200,
            ServiceKind::Group => 60,
            ServiceKind::Online => 100,
        }
    }

    /// Display name, e.g. "Individual".
    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::Individual => "Individual",
            ServiceKind::Couples => "Couples",
            ServiceKind::Family => "Family",
            ServiceKind::Group => "Group",
            ServiceKind::Online => "Online",
        }
    }

    /// Lowercase words and phrases callers commonly use for this service.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            ServiceKind::Individual => &[
                "individual",
                "individual therapy",
                "one on one",
                "one-on-one",
                "1:1",
                "1 on 1",
                "personal",
                "solo",
                "just me",
                "myself",
            ],
            ServiceKind::Couples => &[
                "couples",
                "couple",
                "couples therapy",
                "marriage",
                "marriage counselling",
                "marriage counseling",
                "relationship",
                "partner",
            ],
            ServiceKind::Family => &["family", "family therapy", "families", "parent and child"],
            ServiceKind::Group => &["group", "group therapy", "group session", "support group"],
            ServiceKind::Online => &[
                "online",
                "online therapy",
                "virtual",
                "video",
                "video call",
                "telehealth",
                "remote",
                "zoom",
            ],
        }
    }

    /// One-line price list: "Individual $120, Couples $180, ...".
    pub fn price_list() -> String {
        Self::ALL
            .iter()
            .map(|s| format!("{} ${}", s.label(), s.price_sgd()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
