//! End-to-end conversations driven through the orchestrator with scripted
//! capabilities and a fixed clock (Wednesday 12 August 2026, 09:30).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use psychbot_booking::{
    Appointment, BookingState, CalendarService, EmailService, FieldStatus, FixedClock,
};
use psychbot_chat::{
    Capabilities, ChatOrchestrator, CompletionService, Passage, Route, VectorIndex,
};
use psychbot_core::config::PsychbotConfig;
use psychbot_core::error::CapabilityError;
use psychbot_core::types::ServiceKind;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct CountingIndex {
    calls: AtomicUsize,
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn search(&self, _query: &str, _k: usize) -> Vec<Passage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        vec![Passage::new("Dr. Tan has twenty years of experience.", 0.8)]
    }
}

#[derive(Default)]
struct CountingCompletion {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionService for CountingCompletion {
    async fn complete(
        &self,
        _prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Dr. Tan has twenty years of experience.".to_string())
    }
}

#[derive(Default)]
struct ScriptedCalendar {
    conflict: AtomicBool,
    created: Mutex<Vec<Appointment>>,
}

#[async_trait]
impl CalendarService for ScriptedCalendar {
    async fn find_conflict(
        &self,
        _start: NaiveDateTime,
        _duration_minutes: u32,
    ) -> Result<bool, CapabilityError> {
        Ok(self.conflict.load(Ordering::SeqCst))
    }

    async fn create_event(&self, appointment: &Appointment) -> Result<String, CapabilityError> {
        let mut created = self.created.lock().unwrap();
        created.push(appointment.clone());
        Ok(format!("evt-{}", created.len()))
    }
}

struct ScriptedEmail {
    fail: AtomicBool,
    sent: AtomicUsize,
}

impl Default for ScriptedEmail {
    fn default() -> Self {
        Self {
            fail: AtomicBool::new(false),
            sent: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmailService for ScriptedEmail {
    async fn send_confirmation(
        &self,
        _recipient: &str,
        _appointment: &Appointment,
    ) -> Result<bool, CapabilityError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CapabilityError::Email("smtp unreachable".to_string()));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

struct Harness {
    orch: ChatOrchestrator,
    index: Arc<CountingIndex>,
    completion: Arc<CountingCompletion>,
    calendar: Arc<ScriptedCalendar>,
    email: Arc<ScriptedEmail>,
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn harness() -> Harness {
    let index = Arc::new(CountingIndex::default());
    let completion = Arc::new(CountingCompletion::default());
    let calendar = Arc::new(ScriptedCalendar::default());
    let email = Arc::new(ScriptedEmail::default());
    let orch = ChatOrchestrator::new(
        &PsychbotConfig::default(),
        Capabilities {
            index: index.clone(),
            completion: completion.clone(),
            calendar: calendar.clone(),
            email: email.clone(),
        },
    )
    .with_clock(Arc::new(FixedClock(at(2026, 8, 12, 9, 30))));
    Harness {
        orch,
        index,
        completion,
        calendar,
        email,
    }
}

/// Walk a session to `Confirming` for John Tan, Monday 17 August 10am.
async fn to_confirming(h: &Harness, sid: &str) -> String {
    h.orch.handle(sid, "I want to book an appointment").await;
    h.orch.handle(sid, "John Tan").await;
    h.orch.handle(sid, "Z1234567B").await;
    h.orch.handle(sid, "individual").await;
    h.orch.handle(sid, "next Monday 10am").await;
    h.orch.handle(sid, "john@example.com").await
}

// =============================================================================
// Information
// =============================================================================

#[tokio::test]
async fn test_services_question_is_a_quick_hit() {
    let h = harness();
    let reply = h.orch.reply("web-1", "What services do you offer?").await;
    assert_eq!(reply.route, Route::Quick);
    assert!(reply.text.contains("Individual, Couples, Family, Group and Online"));
    assert!(reply.text.contains("Individual $120"));
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_quick_lookup_is_repeatable() {
    let h = harness();
    let first = h.orch.handle("web-1", "How much does it cost?").await;
    let second = h.orch.handle("web-1", "How much does it cost?").await;
    assert_eq!(first, second);
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_open_question_goes_to_answerer() {
    let h = harness();
    let reply = h.orch.reply("web-1", "How experienced is Dr. Tan?").await;
    assert_eq!(reply.route, Route::Answer);
    assert_eq!(reply.text, "Dr. Tan has twenty years of experience.");
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_greeting_with_question_goes_to_answerer() {
    let h = harness();
    let reply = h.orch.reply("web-1", "Hi, do you treat insomnia?").await;
    assert_eq!(reply.route, Route::Answer);
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 1);

    let reply = h.orch.reply("web-1", "Hello!").await;
    assert_eq!(reply.route, Route::Quick);
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Booking
// =============================================================================

#[tokio::test]
async fn test_booking_intent_starts_collecting_name() {
    let h = harness();
    assert_eq!(h.orch.session_count(), 0);
    let reply = h.orch.reply("web-1", "I want to book an appointment").await;
    assert_eq!(reply.route, Route::BookingStart);
    assert!(reply.text.contains("full name"));
    assert_eq!(
        h.orch.booking_state("web-1").await.unwrap(),
        BookingState::CollectingName
    );
}

#[tokio::test]
async fn test_closed_day_is_rejected_and_draft_kept() {
    let h = harness();
    let sid = "web-1";
    h.orch.handle(sid, "I want to book an appointment").await;
    h.orch.handle(sid, "John").await;
    h.orch.handle(sid, "Z1234567B").await;
    h.orch.handle(sid, "individual").await;
    let reply = h.orch.handle(sid, "next Sunday 10am").await;

    assert!(reply.contains("closed on Sunday"), "{reply}");
    let booking = h.orch.booking(sid).await.unwrap();
    assert_eq!(booking.state, BookingState::CollectingDateTime);
    assert_eq!(booking.draft.name.valid().map(String::as_str), Some("John"));
    assert_eq!(
        booking.draft.identifier.valid().map(String::as_str),
        Some("Z1234567B")
    );
    assert_eq!(booking.draft.service.valid(), Some(&ServiceKind::Individual));
    assert!(booking.draft.datetime.is_unset());
}

#[tokio::test]
async fn test_invalid_input_changes_nothing() {
    let h = harness();
    let sid = "web-1";
    h.orch.handle(sid, "book").await;
    h.orch.handle(sid, "John Tan").await;
    let before = h.orch.booking(sid).await.unwrap();

    let reply = h.orch.handle(sid, "Z1234567A").await;
    assert!(reply.starts_with("Sorry"));
    assert_eq!(h.orch.booking(sid).await.unwrap(), before);
}

#[tokio::test]
async fn test_declining_confirmation_reopens_datetime() {
    let h = harness();
    let sid = "web-1";
    let summary = to_confirming(&h, sid).await;
    assert!(summary.contains("Z****567B"));
    assert!(summary.contains("Monday, 17 August 2026 at 10am"));
    assert_eq!(
        h.orch.booking_state(sid).await.unwrap(),
        BookingState::Confirming
    );

    h.orch.handle(sid, "no").await;
    let booking = h.orch.booking(sid).await.unwrap();
    assert_eq!(booking.state, BookingState::CollectingDateTime);
    assert!(booking.draft.name.is_valid());
    assert!(booking.draft.identifier.is_valid());
    assert!(booking.draft.service.is_valid());
    assert!(booking.draft.email.is_valid());
    assert_eq!(booking.draft.datetime, FieldStatus::Unset);

    // A new slot skips straight back to confirmation.
    let reply = h.orch.handle(sid, "18/8/2026 3pm").await;
    assert!(reply.contains("Tuesday, 18 August 2026 at 3pm"), "{reply}");
    assert_eq!(
        h.orch.booking_state(sid).await.unwrap(),
        BookingState::Confirming
    );
}

#[tokio::test]
async fn test_confirmed_booking_commits() {
    let h = harness();
    let sid = "web-1";
    to_confirming(&h, sid).await;
    let reply = h.orch.handle(sid, "yes").await;

    assert!(reply.contains("evt-1"));
    let booking = h.orch.booking(sid).await.unwrap();
    assert_eq!(booking.state, BookingState::Committed);
    assert_eq!(booking.reference.as_deref(), Some("evt-1"));

    let created = h.calendar.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].start, at(2026, 8, 17, 10, 0));
    assert_eq!(created[0].duration_minutes, 50);
    assert_eq!(h.email.sent.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_email_failure_still_commits() {
    let h = harness();
    h.email.fail.store(true, Ordering::SeqCst);
    let sid = "web-1";
    to_confirming(&h, sid).await;
    let reply = h.orch.handle(sid, "yes").await;

    assert!(reply.contains("couldn't send the confirmation email"));
    assert_eq!(
        h.orch.booking_state(sid).await.unwrap(),
        BookingState::Committed
    );
}

#[tokio::test]
async fn test_taken_slot_asks_for_another() {
    let h = harness();
    h.calendar.conflict.store(true, Ordering::SeqCst);
    let sid = "web-1";
    h.orch.handle(sid, "book").await;
    h.orch.handle(sid, "John Tan").await;
    h.orch.handle(sid, "Z1234567B").await;
    h.orch.handle(sid, "couples").await;
    let reply = h.orch.handle(sid, "next Monday 10am").await;

    assert!(reply.contains("already taken"));
    let booking = h.orch.booking(sid).await.unwrap();
    assert_eq!(booking.state, BookingState::CollectingDateTime);
    assert!(booking.draft.datetime.is_unset());
}

#[tokio::test]
async fn test_cancel_from_every_collecting_state() {
    let steps = ["John Tan", "Z1234567B", "individual", "next Monday 10am", "john@example.com"];
    for depth in 0..=steps.len() {
        let h = harness();
        let sid = "web-1";
        h.orch.handle(sid, "book").await;
        for step in &steps[..depth] {
            h.orch.handle(sid, step).await;
        }
        assert!(h.orch.booking_state(sid).await.unwrap().is_active());

        h.orch.handle(sid, "cancel").await;
        let booking = h.orch.booking(sid).await.unwrap();
        assert_eq!(booking.state, BookingState::Cancelled, "depth {depth}");
        assert!(booking.draft.name.is_unset());
        assert!(booking.draft.email.is_unset());
    }
}

#[tokio::test]
async fn test_new_booking_after_commit_starts_fresh() {
    let h = harness();
    let sid = "web-1";
    to_confirming(&h, sid).await;
    h.orch.handle(sid, "yes").await;

    let reply = h.orch.reply(sid, "I'd like to book another appointment").await;
    assert_eq!(reply.route, Route::BookingStart);
    let booking = h.orch.booking(sid).await.unwrap();
    assert_eq!(booking.state, BookingState::CollectingName);
    assert!(booking.draft.name.is_unset());
    assert!(booking.reference.is_none());
}

// =============================================================================
// Guardrails
// =============================================================================

#[tokio::test]
async fn test_self_harm_mid_booking_resumes() {
    let h = harness();
    let sid = "web-1";
    h.orch.handle(sid, "book").await;
    h.orch.handle(sid, "John Tan").await;
    h.orch.handle(sid, "Z1234567B").await;
    h.orch.handle(sid, "individual").await;
    h.orch.handle(sid, "next Monday 10am").await;
    assert_eq!(
        h.orch.booking_state(sid).await.unwrap(),
        BookingState::CollectingEmail
    );

    let reply = h.orch.reply(sid, "honestly I want to kill myself").await;
    assert_eq!(reply.route, Route::SelfHarm);
    assert!(reply.text.contains("1800-221-4444"));
    assert!(reply.text.contains("995"));
    assert_eq!(
        h.orch.booking_state(sid).await.unwrap(),
        BookingState::CollectingEmail
    );

    h.orch.handle(sid, "john@example.com").await;
    let booking = h.orch.booking(sid).await.unwrap();
    assert_eq!(booking.state, BookingState::Confirming);
    assert_eq!(
        booking.draft.email.valid().map(String::as_str),
        Some("john@example.com")
    );
}

#[tokio::test]
async fn test_off_topic_mid_booking_is_redirected_and_booking_resumes() {
    let h = harness();
    let sid = "web-1";
    h.orch.handle(sid, "book").await;
    h.orch.handle(sid, "John Tan").await;
    h.orch.handle(sid, "Z1234567B").await;
    let before = h.orch.booking(sid).await.unwrap();
    assert_eq!(before.state, BookingState::CollectingService);

    let reply = h
        .orch
        .reply(sid, "Can you recommend a good movie on Netflix?")
        .await;
    assert_eq!(reply.route, Route::OffTopic);
    assert!(reply.text.contains("Which service would you like?"));
    assert_eq!(h.orch.booking(sid).await.unwrap(), before);
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 0);

    let reply = h.orch.reply(sid, "couples").await;
    assert_eq!(reply.route, Route::Booking);
    assert_eq!(
        h.orch.booking_state(sid).await.unwrap(),
        BookingState::CollectingDateTime
    );
}

#[tokio::test]
async fn test_off_topic_sentence_is_not_taken_as_a_name() {
    let h = harness();
    let sid = "web-1";
    h.orch.handle(sid, "book").await;

    let reply = h
        .orch
        .reply(sid, "Who won the football match last night?")
        .await;
    assert_eq!(reply.route, Route::OffTopic);
    let booking = h.orch.booking(sid).await.unwrap();
    assert_eq!(booking.state, BookingState::CollectingName);
    assert!(booking.draft.name.is_unset());
}

#[tokio::test]
async fn test_field_answer_with_off_topic_word_is_accepted() {
    let h = harness();
    let sid = "web-1";
    h.orch.handle(sid, "book").await;
    h.orch.handle(sid, "John Tan").await;
    h.orch.handle(sid, "Z1234567B").await;
    h.orch.handle(sid, "individual").await;
    h.orch.handle(sid, "next Monday 10am").await;

    let reply = h.orch.reply(sid, "python.dev@example.com").await;
    assert_eq!(reply.route, Route::Booking);
    let booking = h.orch.booking(sid).await.unwrap();
    assert_eq!(booking.state, BookingState::Confirming);
    assert_eq!(
        booking.draft.email.valid().map(String::as_str),
        Some("python.dev@example.com")
    );
}

#[tokio::test]
async fn test_self_harm_outside_booking_never_reaches_answerer() {
    let h = harness();
    let reply = h.orch.reply("web-1", "I've been thinking about self-harm").await;
    assert_eq!(reply.route, Route::SelfHarm);
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.orch.booking_state("web-1").await.unwrap(),
        BookingState::Idle
    );
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_sessions_are_isolated() {
    let h = harness();
    h.orch.handle("a", "book").await;
    h.orch.handle("a", "John Tan").await;
    h.orch.handle("b", "hello").await;

    assert_eq!(
        h.orch.booking_state("a").await.unwrap(),
        BookingState::CollectingId
    );
    assert_eq!(h.orch.booking_state("b").await.unwrap(), BookingState::Idle);
    assert_eq!(h.orch.history("a").await.unwrap().len(), 4);
    assert_eq!(h.orch.history("b").await.unwrap().len(), 2);
}
