//! Booking state machine with validated transitions.
//!
//! Idle -> CollectingName -> CollectingId -> CollectingService ->
//! CollectingDateTime -> CollectingEmail -> Confirming -> Committed,
//! with Cancelled reachable from every active state.

use crate::error::BookingError;
use crate::types::BookingState;

/// Validate that a booking state change is allowed.
///
/// Valid transitions:
/// - Idle, Committed or Cancelled -> CollectingName (new booking)
/// - a collecting state -> any later collecting state or Confirming
///   (fields that are already valid are skipped)
/// - Confirming -> CollectingDateTime (caller rejected the summary)
/// - Confirming -> Committed
/// - any active state -> Cancelled
pub fn validate_transition(from: BookingState, to: BookingState) -> Result<(), BookingError> {
    let forward = match (from.step_index(), to.step_index()) {
        (Some(a), Some(b)) => from != BookingState::Confirming && b > a,
        _ => false,
    };

    let valid = forward
        || matches!(
            (from, to),
            (
                BookingState::Idle | BookingState::Committed | BookingState::Cancelled,
                BookingState::CollectingName
            ) | (BookingState::Confirming, BookingState::CollectingDateTime)
                | (BookingState::Confirming, BookingState::Committed)
        )
        || (from.is_active() && to == BookingState::Cancelled);

    if valid {
        Ok(())
    } else {
        Err(BookingError::InvalidTransition(from, to))
    }
}
