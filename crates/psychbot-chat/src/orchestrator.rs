//! Chat orchestrator: central coordinator wiring guardrails, booking,
//! quick responses and retrieval-augmented answers.
//!
//! Every inbound message is routed through the same sequence: guardrail
//! short-circuit, in-progress booking, booking intent, quick response, then
//! the answerer. The reply and the message are appended to the session
//! history before the call returns.

use std::sync::Arc;

use psychbot_booking::{
    intent, BookingFlow, BookingSession, BookingState, CalendarService, Clock, EmailService,
    OperatingHours,
};
use psychbot_core::config::{PsychbotConfig, SessionConfig};
use psychbot_core::guardrail::{Classification, GuardrailClassifier};
use psychbot_core::types::Turn;
use tracing::{debug, error, info};

use crate::answerer::{CompletionService, RagAnswerer, VectorIndex};
use crate::context::{Session, SessionStore};
use crate::error::ChatError;
use crate::quick::QuickResponseCache;

const EMPTY_MESSAGE_REPLY: &str = "I didn't catch anything there. How can I help you today? \
     You can ask about our services, fees or opening hours, or book an appointment.";

const STORE_FAILURE_REPLY: &str =
    "Sorry, something went wrong on our side. Please try again in a moment.";

/// Characters of an inbound message shown in debug logs.
const LOG_PREVIEW_CHARS: usize = 24;

/// External collaborators the orchestrator calls out to.
pub struct Capabilities {
    pub index: Arc<dyn VectorIndex>,
    pub completion: Arc<dyn CompletionService>,
    pub calendar: Arc<dyn CalendarService>,
    pub email: Arc<dyn EmailService>,
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Empty,
    SelfHarm,
    OffTopic,
    Privacy,
    BookingStart,
    Booking,
    Quick,
    Answer,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Empty => "empty",
            Route::SelfHarm => "self_harm",
            Route::OffTopic => "off_topic",
            Route::Privacy => "privacy",
            Route::BookingStart => "booking_start",
            Route::Booking => "booking",
            Route::Quick => "quick",
            Route::Answer => "answer",
        }
    }
}

/// A reply and the route that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub route: Route,
}

/// Central chat orchestrator owning every session.
pub struct ChatOrchestrator {
    guardrail: GuardrailClassifier,
    quick: QuickResponseCache,
    answerer: RagAnswerer,
    booking: BookingFlow,
    store: SessionStore,
    config: SessionConfig,
}

impl ChatOrchestrator {
    pub fn new(config: &PsychbotConfig, capabilities: Capabilities) -> Self {
        let hours = OperatingHours::default();
        let guardrail = GuardrailClassifier::new(&config.guardrail, &config.clinic);
        let quick = QuickResponseCache::new(&config.quick_responses, &config.clinic, &hours);
        let answerer = RagAnswerer::new(
            capabilities.index,
            capabilities.completion,
            &config.retrieval,
            &config.llm,
            &config.clinic,
            &hours,
        );
        let booking = BookingFlow::new(
            capabilities.calendar,
            capabilities.email,
            &config.booking,
            &config.clinic,
        )
        .with_hours(hours);

        Self {
            guardrail,
            quick,
            answerer,
            booking,
            store: SessionStore::new(config.session.timeout_minutes),
            config: config.session.clone(),
        }
    }

    /// Replace the clock the booking flow uses for date checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.booking = self.booking.with_clock(clock);
        self
    }

    /// Handle one inbound message and return the reply text.
    pub async fn handle(&self, session_id: &str, message: &str) -> String {
        self.reply(session_id, message).await.text
    }

    /// Handle one inbound message, reporting which route answered it.
    pub async fn reply(&self, session_id: &str, message: &str) -> Reply {
        let message = self.clip(message);
        debug!(session_id, preview = %preview(message), "Inbound message");

        let handle = match self.store.get_or_create(session_id) {
            Ok(handle) => handle,
            Err(e) => {
                error!(session_id, error = %e, "Session store unavailable");
                return Reply {
                    text: STORE_FAILURE_REPLY.to_string(),
                    route: Route::Empty,
                };
            }
        };

        let mut session = handle.lock().await;
        let reply = self.route(&mut session, message).await;
        info!(
            session_id,
            route = reply.route.as_str(),
            booking_state = %session.booking.state,
            "Message handled"
        );

        let max_turns = self.config.max_stored_turns;
        session.push(Turn::user(message), max_turns);
        session.push(Turn::assistant(reply.text.clone()), max_turns);
        reply
    }

    async fn route(&self, session: &mut Session, message: &str) -> Reply {
        if message.trim().is_empty() {
            return Reply {
                text: EMPTY_MESSAGE_REPLY.to_string(),
                route: Route::Empty,
            };
        }

        let in_booking = session.booking.state.is_active();
        match self.guardrail.classify(message) {
            Classification::SelfHarm(text) => {
                return Reply {
                    text,
                    route: Route::SelfHarm,
                }
            }
            Classification::PrivacySensitive(text) => {
                return Reply {
                    text,
                    route: Route::Privacy,
                }
            }
            // A valid answer to the pending booking question goes through even
            // when it contains an off-topic word ("python.dev@mail.com").
            Classification::OffTopic(text)
                if !in_booking || !self.booking.is_field_answer(&session.booking, message) =>
            {
                let text = if in_booking {
                    format!(
                        "{text} To continue your booking: {}",
                        self.booking.current_prompt(&session.booking)
                    )
                } else {
                    text
                };
                return Reply {
                    text,
                    route: Route::OffTopic,
                };
            }
            _ => {}
        }

        if in_booking {
            return Reply {
                text: self.booking.step(&mut session.booking, message).await,
                route: Route::Booking,
            };
        }

        if intent::is_booking_intent(message) {
            return Reply {
                text: self.booking.start(&mut session.booking),
                route: Route::BookingStart,
            };
        }

        if let Some(text) = self.quick.lookup(message) {
            return Reply {
                text,
                route: Route::Quick,
            };
        }

        Reply {
            text: self.answerer.answer(message, &session.turns).await,
            route: Route::Answer,
        }
    }

    /// Truncate overlong input to the configured character limit.
    fn clip<'a>(&self, message: &'a str) -> &'a str {
        match message.char_indices().nth(self.config.max_message_chars) {
            Some((idx, _)) => {
                debug!(limit = self.config.max_message_chars, "Truncating long message");
                &message[..idx]
            }
            None => message,
        }
    }

    // -- Session admin --

    /// Turn history for a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>, ChatError> {
        let handle = self.store.get(session_id)?;
        let session = handle.lock().await;
        Ok(session.turns.clone())
    }

    pub async fn booking_state(&self, session_id: &str) -> Result<BookingState, ChatError> {
        Ok(self.booking(session_id).await?.state)
    }

    /// Snapshot of the session's booking state and draft.
    pub async fn booking(&self, session_id: &str) -> Result<BookingSession, ChatError> {
        let handle = self.store.get(session_id)?;
        let session = handle.lock().await;
        Ok(session.booking.clone())
    }

    pub fn end_session(&self, session_id: &str) -> Result<(), ChatError> {
        self.store.remove(session_id)?;
        info!(session_id, "Session ended");
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Drop sessions idle past the configured timeout.
    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired()
    }
}

fn preview(message: &str) -> &str {
    match message.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}
