//! Calendar and email collaborators used to commit a booking.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use psychbot_core::error::CapabilityError;

use crate::types::Appointment;

/// Appointment calendar.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Whether any existing event overlaps `[start, start + duration_minutes)`.
    async fn find_conflict(
        &self,
        start: NaiveDateTime,
        duration_minutes: u32,
    ) -> Result<bool, CapabilityError>;

    /// Write the appointment and return the new event id.
    async fn create_event(&self, appointment: &Appointment) -> Result<String, CapabilityError>;
}

/// Outbound confirmation email.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Send the booking confirmation. `Ok(false)` means the provider
    /// accepted the call but did not deliver.
    async fn send_confirmation(
        &self,
        recipient: &str,
        appointment: &Appointment,
    ) -> Result<bool, CapabilityError>;
}
