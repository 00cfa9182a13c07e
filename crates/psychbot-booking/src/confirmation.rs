//! Confirmation summary and commit outcome messages.

use crate::datetime::format_slot;
use crate::types::Appointment;
use crate::validate::mask_identifier;

/// Read-back of every field before commit. The identifier is masked.
pub fn summary(appointment: &Appointment) -> String {
    format!(
        "Here are your booking details:\n\
         - Name: {}\n\
         - NRIC/FIN: {}\n\
         - Service: {} therapy (${})\n\
         - Date and time: {} ({} minutes)\n\
         - Email: {}\n\
         Shall I confirm this booking? (yes/no)",
        appointment.patient_name,
        mask_identifier(&appointment.identifier),
        appointment.service,
        appointment.service.price_sgd(),
        format_slot(appointment.start),
        appointment.duration_minutes,
        appointment.email,
    )
}

/// Reply after the calendar write succeeded.
///
/// `email_sent` is false when the confirmation email failed; the booking
/// still stands and the reply says so.
pub fn committed_message(appointment: &Appointment, reference: &str, email_sent: bool) -> String {
    let mut reply = format!(
        "You're booked! Your {} therapy session is on {}. Your booking reference is {}.",
        appointment.service,
        format_slot(appointment.start),
        reference
    );
    if email_sent {
        reply.push_str(&format!(
            " A confirmation email is on its way to {}.",
            appointment.email
        ));
    } else {
        reply.push_str(&format!(
            " We couldn't send the confirmation email to {} just now, but your booking is \
             confirmed. Please keep your reference number.",
            appointment.email
        ));
    }
    reply
}

/// Reply when the calendar write failed. The draft is kept for a retry.
pub fn commit_failed_message(phone: &str) -> String {
    format!(
        "Sorry, I couldn't save your booking just now. Reply \"yes\" to try again, \
         or call us on {phone}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use psychbot_core::types::ServiceKind;

    fn appointment() -> Appointment {
        Appointment {
            patient_name: "John".to_string(),
            identifier: "Z1234567B".to_string(),
            service: ServiceKind::Individual,
            start: NaiveDate::from_ymd_opt(2026, 8, 17)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            duration_minutes: 50,
            email: "john@example.com".to_string(),
        }
    }

    #[test]
    fn test_summary_masks_identifier() {
        let text = summary(&appointment());
        assert!(text.contains("Z****567B"));
        assert!(!text.contains("Z1234567B"));
        assert!(text.contains("Individual therapy ($120)"));
        assert!(text.contains("Monday, 17 August 2026 at 10am"));
        assert!(text.contains("john@example.com"));
        assert!(text.ends_with("(yes/no)"));
    }

    #[test]
    fn test_committed_message_with_email() {
        let text = committed_message(&appointment(), "evt-42", true);
        assert!(text.contains("evt-42"));
        assert!(text.contains("on its way"));
    }

    #[test]
    fn test_committed_message_email_warning() {
        let text = committed_message(&appointment(), "evt-42", false);
        assert!(text.contains("evt-42"));
        assert!(text.contains("couldn't send the confirmation email"));
    }

    #[test]
    fn test_commit_failed_message() {
        let text = commit_failed_message("+65 6311 2330");
        assert!(text.contains("try again"));
        assert!(text.contains("+65 6311 2330"));
    }
}
