//! Confirmation "email" written to the log.

use async_trait::async_trait;
use psychbot_booking::{Appointment, EmailService};
use psychbot_core::error::CapabilityError;

/// Records confirmations with `tracing` instead of sending mail.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl EmailService for LogMailer {
    async fn send_confirmation(
        &self,
        recipient: &str,
        appointment: &Appointment,
    ) -> Result<bool, CapabilityError> {
        tracing::info!(
            recipient,
            service = %appointment.service,
            start = %appointment.start,
            "Booking confirmation email"
        );
        Ok(true)
    }
}
