//! Process-local appointment calendar.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use psychbot_booking::{Appointment, CalendarService};
use psychbot_core::error::CapabilityError;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Event {
    id: String,
    appointment: Appointment,
}

/// Calendar kept in memory for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryCalendar {
    events: Mutex<Vec<Event>>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> Result<std::sync::MutexGuard<'_, Vec<Event>>, CapabilityError> {
        self.events
            .lock()
            .map_err(|e| CapabilityError::Calendar(format!("calendar lock poisoned: {}", e)))
    }
}

#[async_trait]
impl CalendarService for InMemoryCalendar {
    async fn find_conflict(
        &self,
        start: NaiveDateTime,
        duration_minutes: u32,
    ) -> Result<bool, CapabilityError> {
        let events = self.events()?;
        Ok(events
            .iter()
            .any(|e| e.appointment.overlaps(start, duration_minutes)))
    }

    async fn create_event(&self, appointment: &Appointment) -> Result<String, CapabilityError> {
        let mut events = self.events()?;
        if let Some(held) = events
            .iter()
            .find(|e| e.appointment.overlaps(appointment.start, appointment.duration_minutes))
        {
            return Err(CapabilityError::Calendar(format!(
                "slot was taken by {} before the booking was saved",
                held.id
            )));
        }
        let id = format!("evt-{}", Uuid::new_v4());
        events.push(Event {
            id: id.clone(),
            appointment: appointment.clone(),
        });
        tracing::info!(event_id = %id, start = %appointment.start, "Calendar event created");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use psychbot_core::types::ServiceKind;

    fn appointment(hour: u32, minute: u32) -> Appointment {
        Appointment {
            patient_name: "John Tan".to_string(),
            identifier: "Z1234567B".to_string(),
            service: ServiceKind::Individual,
            start: NaiveDate::from_ymd_opt(2026, 8, 17)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap(),
            duration_minutes: 50,
            email: "john@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_event_returns_prefixed_id() {
        let calendar = InMemoryCalendar::new();
        let id = calendar.create_event(&appointment(10, 0)).await.unwrap();
        assert!(id.starts_with("evt-"));
        assert_eq!(calendar.events.lock().unwrap()[0].id, id);
    }

    #[tokio::test]
    async fn test_overlap_is_a_conflict() {
        let calendar = InMemoryCalendar::new();
        calendar.create_event(&appointment(10, 0)).await.unwrap();

        assert!(calendar.find_conflict(appointment(10, 30).start, 50).await.unwrap());
        assert!(calendar.find_conflict(appointment(9, 30).start, 50).await.unwrap());
        // Back-to-back sessions do not overlap.
        assert!(!calendar.find_conflict(appointment(10, 50).start, 50).await.unwrap());
        assert!(!calendar.find_conflict(appointment(9, 10).start, 50).await.unwrap());
    }

    #[tokio::test]
    async fn test_double_booking_rejected() {
        let calendar = InMemoryCalendar::new();
        let first = calendar.create_event(&appointment(10, 0)).await.unwrap();
        let err = calendar.create_event(&appointment(10, 20)).await.unwrap_err();
        match err {
            CapabilityError::Calendar(msg) => assert!(msg.contains(&first), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calendar.events.lock().unwrap().len(), 1);
    }
}
