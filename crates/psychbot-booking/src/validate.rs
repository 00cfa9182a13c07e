//! Field validators for the booking draft.
//!
//! Each validator takes the raw message, pulls the field out of it, and
//! returns the normalized value or a [`ValidationError`].

use std::sync::LazyLock;

use psychbot_core::text::{contains_phrase, normalize};
use psychbot_core::types::ServiceKind;
use regex::Regex;

use crate::error::ValidationError;

static NAME_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:my\s+name\s+is|my\s+name's|name\s*:|i\s+am|i'm|im|it's|it\s+is|this\s+is|call\s+me)\s+")
        .expect("Invalid name prefix regex")
});

// Matched against the uppercased message; the identifier must stand alone,
// with no letters or digits glued to either end.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Z0-9])([A-Z])\s*(\d(?:\s*\d){6})\s*([A-Z])(?:[^A-Z0-9]|$)")
        .expect("Invalid identifier regex")
});

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex"));

const ID_WEIGHTS: [u32; 7] = [2, 7, 6, 5, 4, 3, 2];

// =============================================================================
// Name
// =============================================================================

/// Accept a patient name: 2 to 100 characters after trimming, with at least
/// one letter. Leading phrases like "my name is" are dropped.
pub fn validate_name(input: &str) -> Result<String, ValidationError> {
    let stripped = NAME_PREFIX.replace(input, "");
    let name = stripped
        .trim()
        .trim_end_matches(['.', '!', ','])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let len = name.chars().count();
    if !(2..=100).contains(&len) {
        return Err(ValidationError::NameLength);
    }
    if !name.chars().any(char::is_alphabetic) {
        return Err(ValidationError::NameNoLetters);
    }
    Ok(name)
}

// =============================================================================
// Identifier
// =============================================================================

/// Accept an NRIC/FIN-style identifier: a letter, seven digits, and a check
/// letter. Spaces inside it are ignored and case does not matter. Returns the
/// identifier uppercased without spaces.
pub fn validate_identifier(input: &str) -> Result<String, ValidationError> {
    let upper = input.to_uppercase();
    let caps = IDENTIFIER
        .captures(&upper)
        .ok_or(ValidationError::IdentifierFormat)?;
    let prefix = caps[1].chars().next().ok_or(ValidationError::IdentifierFormat)?;
    let digits: String = caps[2].chars().filter(|c| c.is_ascii_digit()).collect();
    let check = caps[3].chars().next().ok_or(ValidationError::IdentifierFormat)?;

    if checksum_letter(prefix, &digits) != Some(check) {
        return Err(ValidationError::IdentifierChecksum);
    }
    Ok(format!("{prefix}{digits}{check}"))
}

/// Check letter for a prefix letter and seven digits:
/// `'A' + ((sum(d[i] * w[i]) + (prefix - 'A')) mod 26)`.
pub fn checksum_letter(prefix: char, digits: &str) -> Option<char> {
    if !prefix.is_ascii_uppercase() || digits.len() != ID_WEIGHTS.len() {
        return None;
    }
    let mut sum = u32::from(prefix) - u32::from('A');
    for (ch, weight) in digits.chars().zip(ID_WEIGHTS) {
        sum += ch.to_digit(10)? * weight;
    }
    char::from_u32(u32::from('A') + sum % 26)
}

/// Hide the middle of an identifier: `Z1234567B` becomes `Z****567B`.
pub fn mask_identifier(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() < 5 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", chars[0], "*".repeat(chars.len() - 5), tail)
}

// =============================================================================
// Service
// =============================================================================

/// Match a service by name or synonym. The longest matching synonym wins so
/// "online couples therapy" resolves on the more specific phrase.
pub fn validate_service(input: &str) -> Result<ServiceKind, ValidationError> {
    let text = normalize(input);
    let mut best: Option<(ServiceKind, usize)> = None;

    for service in ServiceKind::ALL {
        for synonym in service.synonyms() {
            let phrase = normalize(synonym);
            if contains_phrase(&text, &phrase) && best.map_or(true, |(_, len)| phrase.len() > len) {
                best = Some((service, phrase.len()));
            }
        }
    }

    best.map(|(service, _)| service)
        .ok_or_else(|| ValidationError::UnknownService(input.trim().to_string()))
}

// =============================================================================
// Email
// =============================================================================

/// Accept `local@domain.tld`: one `@`, no spaces, and a dotted domain with
/// non-empty labels. If the message contains other words, the single token
/// with an `@` is taken.
pub fn validate_email(input: &str) -> Result<String, ValidationError> {
    let candidates: Vec<&str> = input
        .split_whitespace()
        .filter(|token| token.contains('@'))
        .collect();
    let [token] = candidates.as_slice() else {
        return Err(ValidationError::Email);
    };
    let email = token.trim_matches(|c: char| matches!(c, '<' | '>' | ',' | ';' | '(' | ')'));
    let email = email.trim_end_matches('.');

    if !EMAIL.is_match(email) {
        return Err(ValidationError::Email);
    }
    let domain = email.rsplit('@').next().unwrap_or_default();
    if domain.split('.').any(str::is_empty) {
        return Err(ValidationError::Email);
    }
    Ok(email.to_string())
}
