//! Regex-based detection of booking-related intents.
//!
//! Patterns are compiled once and matched against the raw message
//! (case-insensitive) or its normalized form for the short-answer checks.

use std::sync::LazyLock;

use psychbot_core::text::normalize;
use regex::Regex;

static BOOKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:book(?:ing)?|appointments?|appt|schedul(?:e|ing)|reserv(?:e|ation)|make\s+an?\s+appointment|see\s+(?:a|the)\s+(?:doctor|therapist|psychologist|counsellor|counselor))\b",
    )
    .expect("Invalid booking regex")
});

static CANCEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:cancel|abort|never\s*mind|nevermind|forget\s+it|quit)\b")
        .expect("Invalid cancel regex")
});

static STOP_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:stop|exit)(?:\s+please)?$").expect("Invalid stop regex"));

static YES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:yes|y|yeah|yea|yep|yup|sure|ok|okay|correct|confirm|confirmed|right|thats right|sounds good|go ahead|please do|do it)\b",
    )
    .expect("Invalid yes regex")
});

// A "yes" carrying one of these is a request to change something, not a confirmation.
static CORRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:but|change|instead|actually|except|wait|hold on)\b")
        .expect("Invalid correction regex")
});

static NO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:no|n|nope|nah|not quite|not really|wrong|incorrect|change)\b")
        .expect("Invalid no regex")
});

static RETRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:retry|try again|again|please retry|check again)\b").expect("Invalid retry regex")
});

/// Caller wants to start a booking.
pub fn is_booking_intent(message: &str) -> bool {
    BOOKING.is_match(message)
}

/// Caller wants to abandon the booking in progress. `stop` and `exit` only
/// count when they are the whole message.
pub fn is_cancel(message: &str) -> bool {
    CANCEL.is_match(message) || STOP_ONLY.is_match(&normalize(message))
}

/// Short affirmative answer. An affirmative followed by a correction
/// ("yes, but change the time") does not count.
pub fn is_yes(message: &str) -> bool {
    let text = normalize(message);
    YES.is_match(&text) && !CORRECTION.is_match(&text)
}

/// Short negative answer.
pub fn is_no(message: &str) -> bool {
    NO.is_match(&normalize(message))
}

/// Request to repeat the last external check.
pub fn is_retry(message: &str) -> bool {
    RETRY.is_match(&normalize(message))
}
