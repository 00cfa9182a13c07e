//! Core types for the booking flow.
//!
//! Defines the booking states, the per-field draft, and the appointment
//! handed to the calendar and email capabilities on commit.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use psychbot_core::types::ServiceKind;
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Where a session is in the booking conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    #[default]
    Idle,
    CollectingName,
    CollectingId,
    CollectingService,
    CollectingDateTime,
    CollectingEmail,
    Confirming,
    Committed,
    Cancelled,
}

impl BookingState {
    /// Every state, in flow order.
    pub const ALL: [BookingState; 9] = [
        BookingState::Idle,
        BookingState::CollectingName,
        BookingState::CollectingId,
        BookingState::CollectingService,
        BookingState::CollectingDateTime,
        BookingState::CollectingEmail,
        BookingState::Confirming,
        BookingState::Committed,
        BookingState::Cancelled,
    ];

    /// `Committed` or `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Committed | BookingState::Cancelled)
    }

    /// A booking is underway and owns the next message.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingState::Idle) && !self.is_terminal()
    }

    /// Position in the collection order, for the collecting states and
    /// `Confirming`.
    pub(crate) fn step_index(&self) -> Option<u8> {
        match self {
            BookingState::CollectingName => Some(1),
            BookingState::CollectingId => Some(2),
            BookingState::CollectingService => Some(3),
            BookingState::CollectingDateTime => Some(4),
            BookingState::CollectingEmail => Some(5),
            BookingState::Confirming => Some(6),
            _ => None,
        }
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingState::Idle => write!(f, "idle"),
            BookingState::CollectingName => write!(f, "collecting_name"),
            BookingState::CollectingId => write!(f, "collecting_id"),
            BookingState::CollectingService => write!(f, "collecting_service"),
            BookingState::CollectingDateTime => write!(f, "collecting_date_time"),
            BookingState::CollectingEmail => write!(f, "collecting_email"),
            BookingState::Confirming => write!(f, "confirming"),
            BookingState::Committed => write!(f, "committed"),
            BookingState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Validation status of one draft field.
///
/// Rejected input never reaches the draft, so there is no invalid variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum FieldStatus<T> {
    Unset,
    /// Parsed and locally valid, awaiting an external check.
    Pending(T),
    Valid(T),
}

impl<T> Default for FieldStatus<T> {
    fn default() -> Self {
        FieldStatus::Unset
    }
}

impl<T> FieldStatus<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, FieldStatus::Valid(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, FieldStatus::Unset)
    }

    /// The value if it has been fully validated.
    pub fn valid(&self) -> Option<&T> {
        match self {
            FieldStatus::Valid(v) => Some(v),
            _ => None,
        }
    }

    /// The value if it is pending an external check.
    pub fn pending(&self) -> Option<&T> {
        match self {
            FieldStatus::Pending(v) => Some(v),
            _ => None,
        }
    }
}

// =============================================================================
// Draft and appointment
// =============================================================================

/// Details gathered so far for one booking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookingDraft {
    pub name: FieldStatus<String>,
    /// Normalized identifier, uppercase without spaces.
    pub identifier: FieldStatus<String>,
    pub service: FieldStatus<ServiceKind>,
    pub datetime: FieldStatus<NaiveDateTime>,
    pub email: FieldStatus<String>,
}

impl BookingDraft {
    /// Every field is valid.
    pub fn is_complete(&self) -> bool {
        self.name.is_valid()
            && self.identifier.is_valid()
            && self.service.is_valid()
            && self.datetime.is_valid()
            && self.email.is_valid()
    }

    /// First collecting state whose field is not yet valid, or `Confirming`
    /// when the draft is complete.
    pub fn next_state(&self) -> BookingState {
        if !self.name.is_valid() {
            BookingState::CollectingName
        } else if !self.identifier.is_valid() {
            BookingState::CollectingId
        } else if !self.service.is_valid() {
            BookingState::CollectingService
        } else if !self.datetime.is_valid() {
            BookingState::CollectingDateTime
        } else if !self.email.is_valid() {
            BookingState::CollectingEmail
        } else {
            BookingState::Confirming
        }
    }

    /// Build the commit payload. `None` unless every field is valid.
    pub fn to_appointment(&self, duration_minutes: u32) -> Option<Appointment> {
        Some(Appointment {
            patient_name: self.name.valid()?.clone(),
            identifier: self.identifier.valid()?.clone(),
            service: *self.service.valid()?,
            start: *self.datetime.valid()?,
            duration_minutes,
            email: self.email.valid()?.clone(),
        })
    }

    pub fn clear(&mut self) {
        *self = BookingDraft::default();
    }
}

/// A confirmed slot, as written to the calendar and sent by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub patient_name: String,
    pub identifier: String,
    pub service: ServiceKind,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub email: String,
}

impl Appointment {
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether this appointment overlaps the half-open slot
    /// `[start, start + duration_minutes)`.
    pub fn overlaps(&self, start: NaiveDateTime, duration_minutes: u32) -> bool {
        let end = start + Duration::minutes(i64::from(duration_minutes));
        self.start < end && start < self.end()
    }
}

/// Booking state and draft owned by one chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingSession {
    pub state: BookingState,
    pub draft: BookingDraft,
    /// Calendar event id of the last committed booking.
    pub reference: Option<String>,
}

impl BookingSession {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 17)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn complete_draft() -> BookingDraft {
        BookingDraft {
            name: FieldStatus::Valid("John".to_string()),
            identifier: FieldStatus::Valid("Z1234567B".to_string()),
            service: FieldStatus::Valid(ServiceKind::Individual),
            datetime: FieldStatus::Valid(slot(10, 0)),
            email: FieldStatus::Valid("john@example.com".to_string()),
        }
    }

    // -------------------------------------------------------------------------
    // BookingState
    // -------------------------------------------------------------------------

    #[test]
    fn test_state_predicates() {
        assert!(!BookingState::Idle.is_active());
        assert!(!BookingState::Idle.is_terminal());
        assert!(BookingState::CollectingEmail.is_active());
        assert!(BookingState::Confirming.is_active());
        assert!(BookingState::Committed.is_terminal());
        assert!(BookingState::Cancelled.is_terminal());
        assert!(!BookingState::Cancelled.is_active());
    }

    #[test]
    fn test_state_display_matches_serde() {
        for state in BookingState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    // -------------------------------------------------------------------------
    // FieldStatus / BookingDraft
    // -------------------------------------------------------------------------

    #[test]
    fn test_field_status_accessors() {
        let f: FieldStatus<u8> = FieldStatus::Pending(3);
        assert_eq!(f.pending(), Some(&3));
        assert_eq!(f.valid(), None);
        assert!(!f.is_valid());
        assert!(FieldStatus::<u8>::default().is_unset());
    }

    #[test]
    fn test_next_state_follows_first_missing_field() {
        let mut draft = BookingDraft::default();
        assert_eq!(draft.next_state(), BookingState::CollectingName);

        draft.name = FieldStatus::Valid("Ann".to_string());
        assert_eq!(draft.next_state(), BookingState::CollectingId);

        let mut draft = complete_draft();
        assert_eq!(draft.next_state(), BookingState::Confirming);

        draft.datetime = FieldStatus::Pending(slot(11, 0));
        assert_eq!(draft.next_state(), BookingState::CollectingDateTime);
    }

    #[test]
    fn test_to_appointment_requires_every_field() {
        let draft = complete_draft();
        let appt = draft.to_appointment(50).unwrap();
        assert_eq!(appt.patient_name, "John");
        assert_eq!(appt.end(), slot(10, 50));

        let mut partial = complete_draft();
        partial.email = FieldStatus::Unset;
        assert!(partial.to_appointment(50).is_none());
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_clear_resets_all_fields() {
        let mut draft = complete_draft();
        draft.clear();
        assert_eq!(draft, BookingDraft::default());
    }

    // -------------------------------------------------------------------------
    // Appointment
    // -------------------------------------------------------------------------

    #[test]
    fn test_overlap_is_half_open() {
        let appt = complete_draft().to_appointment(50).unwrap();
        assert!(appt.overlaps(slot(10, 30), 50));
        assert!(appt.overlaps(slot(9, 30), 50));
        assert!(!appt.overlaps(slot(10, 50), 50));
        assert!(!appt.overlaps(slot(9, 10), 50));
    }
}
