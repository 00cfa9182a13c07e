//! Booking engine for PsychBot.
//!
//! Collects patient details over several turns, validates each field,
//! checks the calendar for conflicts, and commits the appointment through
//! pluggable calendar and email capabilities.

pub mod capability;
pub mod confirmation;
pub mod datetime;
pub mod error;
pub mod flow;
pub mod intent;
pub mod state_machine;
pub mod types;
pub mod validate;

pub use capability::{CalendarService, EmailService};
pub use datetime::{Clock, FixedClock, OperatingHours, SystemClock};
pub use error::{BookingError, ValidationError};
pub use flow::BookingFlow;
pub use types::{Appointment, BookingDraft, BookingSession, BookingState, FieldStatus};
