//! Error types for the booking flow.

use chrono::Weekday;

use crate::types::BookingState;

/// Rejected user input. Rendered as a re-prompt and never stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a name should be between 2 and 100 characters")]
    NameLength,
    #[error("a name should contain letters")]
    NameNoLetters,
    #[error("that doesn't look like an NRIC/FIN number")]
    IdentifierFormat,
    #[error("the check letter of that NRIC/FIN number doesn't match")]
    IdentifierChecksum,
    #[error("I didn't recognise the service \"{0}\"")]
    UnknownService(String),
    #[error("I couldn't find both a date and a time in that")]
    UnparsedDateTime,
    #[error("that date doesn't exist")]
    InvalidDate,
    #[error("that time has already passed")]
    InPast,
    #[error("we're closed on {}", weekday_name(.0))]
    ClosedDay(Weekday),
    #[error("that's outside our opening hours")]
    OutsideHours,
    #[error("that doesn't look like a valid email address")]
    Email,
}

/// Failures of the booking state machine itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid booking transition: {0} -> {1}")]
    InvalidTransition(BookingState, BookingState),
}

pub(crate) fn weekday_name(day: &Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
