//! Conversation sessions and the store that owns them.
//!
//! The store map sits behind a short-lived `std::sync::Mutex`; each session
//! has its own `tokio::sync::Mutex` so one message per session is processed
//! at a time while unrelated sessions proceed concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local};
use psychbot_booking::BookingSession;
use psychbot_core::types::Turn;

use crate::error::ChatError;

// =============================================================================
// Session
// =============================================================================

/// One caller's conversation: turn history plus booking progress.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub turns: Vec<Turn>,
    pub booking: BookingSession,
    pub created_at: DateTime<Local>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
            booking: BookingSession::new(),
            created_at: Local::now(),
        }
    }

    /// Append a turn, dropping the oldest beyond `max_turns`.
    pub fn push(&mut self, turn: Turn, max_turns: usize) {
        self.turns.push(turn);
        if self.turns.len() > max_turns {
            let excess = self.turns.len() - max_turns;
            self.turns.drain(..excess);
        }
    }
}

pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

struct Slot {
    session: SessionHandle,
    last_active: DateTime<Local>,
}

// =============================================================================
// SessionStore
// =============================================================================

/// Sessions keyed by caller-supplied id, with idle expiry.
pub struct SessionStore {
    slots: Mutex<HashMap<String, Slot>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout_minutes: u32) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            timeout: Duration::minutes(i64::from(timeout_minutes)),
        }
    }

    fn is_expired(&self, last_active: DateTime<Local>, now: DateTime<Local>) -> bool {
        now - last_active > self.timeout
    }

    /// Session for `id`, created on first use. An expired session is
    /// replaced by a fresh one. Marks the session active.
    pub fn get_or_create(&self, id: &str) -> Result<SessionHandle, ChatError> {
        self.get_or_create_at(id, Local::now())
    }

    pub(crate) fn get_or_create_at(
        &self,
        id: &str,
        now: DateTime<Local>,
    ) -> Result<SessionHandle, ChatError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))?;

        if let Some(slot) = slots.get_mut(id) {
            if !self.is_expired(slot.last_active, now) {
                slot.last_active = now;
                return Ok(slot.session.clone());
            }
            tracing::info!(session_id = %id, "Session expired, starting a new one");
        } else {
            tracing::debug!(session_id = %id, "Creating session");
        }

        let session = Arc::new(tokio::sync::Mutex::new(Session::new(id)));
        slots.insert(
            id.to_string(),
            Slot {
                session: session.clone(),
                last_active: now,
            },
        );
        Ok(session)
    }

    /// Existing session for `id`; does not refresh its activity time.
    pub fn get(&self, id: &str) -> Result<SessionHandle, ChatError> {
        let slots = self
            .slots
            .lock()
            .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))?;
        slots
            .get(id)
            .map(|slot| slot.session.clone())
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> Result<(), ChatError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))?;
        if slots.remove(id).is_some() {
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(id.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every session idle for longer than the timeout. Returns the
    /// number removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Local::now())
    }

    pub(crate) fn sweep_expired_at(&self, now: DateTime<Local>) -> usize {
        let mut slots = match self.slots.lock() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Session lock poisoned: {}", e);
                return 0;
            }
        };
        let before = slots.len();
        slots.retain(|_, slot| !self.is_expired(slot.last_active, now));
        let removed = before - slots.len();
        if removed > 0 {
            tracing::info!(removed, remaining = slots.len(), "Swept idle sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psychbot_booking::BookingState;

    // ---- Session ----

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new("abc");
        assert_eq!(session.id, "abc");
        assert!(session.turns.is_empty());
        assert_eq!(session.booking.state, BookingState::Idle);
    }

    #[test]
    fn test_push_caps_history() {
        let mut session = Session::new("abc");
        for i in 0..5 {
            session.push(Turn::user(format!("m{i}")), 3);
        }
        let contents: Vec<&str> = session.turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    // ---- Store ----

    #[tokio::test]
    async fn test_get_or_create_reuses_session() {
        let store = SessionStore::new(30);
        let first = store.get_or_create("s1").unwrap();
        first.lock().await.push(Turn::user("hello"), 10);

        let again = store.get_or_create("s1").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.lock().await.turns.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown_session() {
        let store = SessionStore::new(30);
        assert!(matches!(
            store.get("missing"),
            Err(ChatError::SessionNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_remove_session() {
        let store = SessionStore::new(30);
        store.get_or_create("s1").unwrap();
        store.remove("s1").unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.remove("s1"), Err(ChatError::SessionNotFound(_))));
    }

    // ---- Expiry ----

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let store = SessionStore::new(30);
        let now = Local::now();
        let old = store.get_or_create_at("s1", now).unwrap();
        old.lock().await.push(Turn::user("hello"), 10);

        let fresh = store
            .get_or_create_at("s1", now + Duration::minutes(31))
            .unwrap();
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(fresh.lock().await.turns.is_empty());
    }

    #[test]
    fn test_activity_refreshes_expiry() {
        let store = SessionStore::new(30);
        let now = Local::now();
        let first = store.get_or_create_at("s1", now).unwrap();
        let later = store
            .get_or_create_at("s1", now + Duration::minutes(20))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &later));
        let still = store
            .get_or_create_at("s1", now + Duration::minutes(45))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &still));
    }

    #[test]
    fn test_sweep_expired() {
        let store = SessionStore::new(30);
        let now = Local::now();
        store.get_or_create_at("idle", now).unwrap();
        store
            .get_or_create_at("busy", now + Duration::minutes(25))
            .unwrap();

        assert_eq!(store.sweep_expired_at(now + Duration::minutes(31)), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("busy").is_ok());
        assert!(store.get("idle").is_err());
    }
}
