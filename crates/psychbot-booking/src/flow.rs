//! Turn-driven booking flow.
//!
//! [`BookingFlow`] owns the capabilities and rules; the per-session
//! [`BookingSession`] is passed in on every turn. Each turn either accepts a
//! field and moves to the next state whose field is still missing, or leaves
//! the session untouched and re-prompts.

use std::sync::Arc;

use psychbot_core::capability::bounded;
use psychbot_core::config::{BookingConfig, ClinicConfig};
use psychbot_core::error::Capability;
use psychbot_core::types::ServiceKind;
use tracing::{debug, error, info, warn};

use crate::capability::{CalendarService, EmailService};
use crate::confirmation::{commit_failed_message, committed_message, summary};
use crate::datetime::{format_slot, parse_datetime, validate_slot, Clock, OperatingHours, SystemClock};
use crate::error::{BookingError, ValidationError};
use crate::intent;
use crate::state_machine::validate_transition;
use crate::types::{BookingSession, BookingState, FieldStatus};
use crate::validate::{validate_email, validate_identifier, validate_name, validate_service};

const MAX_NAME_WORDS: usize = 5;

/// Drives a [`BookingSession`] from `Idle` to `Committed`.
pub struct BookingFlow {
    calendar: Arc<dyn CalendarService>,
    email: Arc<dyn EmailService>,
    clock: Arc<dyn Clock>,
    hours: OperatingHours,
    config: BookingConfig,
    phone: String,
}

impl BookingFlow {
    pub fn new(
        calendar: Arc<dyn CalendarService>,
        email: Arc<dyn EmailService>,
        config: &BookingConfig,
        clinic: &ClinicConfig,
    ) -> Self {
        Self {
            calendar,
            email,
            clock: Arc::new(SystemClock),
            hours: OperatingHours::default(),
            config: config.clone(),
            phone: clinic.phone.clone(),
        }
    }

    /// Replace the clock used for "is this in the future" checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hours(mut self, hours: OperatingHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn hours(&self) -> &OperatingHours {
        &self.hours
    }

    /// Begin a booking. A session that finished or cancelled a previous
    /// booking starts over with an empty draft.
    pub fn start(&self, booking: &mut BookingSession) -> String {
        match self.try_start(booking) {
            Ok(reply) => reply,
            Err(e) => self.fault(booking, e),
        }
    }

    /// Feed one user message to an active booking.
    pub async fn step(&self, booking: &mut BookingSession, message: &str) -> String {
        match self.try_step(booking, message).await {
            Ok(reply) => reply,
            Err(e) => self.fault(booking, e),
        }
    }

    /// The question the booking is currently waiting on.
    pub fn current_prompt(&self, booking: &BookingSession) -> String {
        self.prompt(booking)
    }

    /// Whether `message` reads as an answer to the active state's question:
    /// a value its validator accepts, a cancel, or yes/no while confirming.
    /// Names have no format, so a name answer must also be short and not a
    /// question. Nothing is stored.
    pub fn is_field_answer(&self, booking: &BookingSession, message: &str) -> bool {
        if intent::is_cancel(message) {
            return true;
        }
        match booking.state {
            BookingState::CollectingName => {
                !message.contains('?')
                    && validate_name(message)
                        .is_ok_and(|name| name.split_whitespace().count() <= MAX_NAME_WORDS)
            }
            BookingState::CollectingId => validate_identifier(message).is_ok(),
            BookingState::CollectingService => validate_service(message).is_ok(),
            BookingState::CollectingDateTime => {
                (booking.draft.datetime.pending().is_some() && intent::is_retry(message))
                    || parse_datetime(message, self.clock.now()).is_ok()
            }
            BookingState::CollectingEmail => validate_email(message).is_ok(),
            BookingState::Confirming => intent::is_yes(message) || intent::is_no(message),
            BookingState::Idle | BookingState::Committed | BookingState::Cancelled => false,
        }
    }

    fn try_start(&self, booking: &mut BookingSession) -> Result<String, BookingError> {
        if booking.state.is_active() {
            return Ok(self.prompt(booking));
        }
        booking.draft.clear();
        booking.reference = None;
        transition(booking, BookingState::CollectingName)?;
        info!("Booking started");
        Ok(format!(
            "I'd be happy to help you book an appointment. {}",
            self.prompt(booking)
        ))
    }

    async fn try_step(
        &self,
        booking: &mut BookingSession,
        message: &str,
    ) -> Result<String, BookingError> {
        if !booking.state.is_active() {
            return Ok("There's no booking in progress. Just say \"book\" to start one.".to_string());
        }

        if intent::is_cancel(message) {
            transition(booking, BookingState::Cancelled)?;
            booking.draft.clear();
            info!("Booking cancelled");
            return Ok(
                "Okay, I've cancelled this booking. Is there anything else I can help you with?"
                    .to_string(),
            );
        }

        match booking.state {
            BookingState::CollectingName => match validate_name(message) {
                Ok(name) => {
                    let lead = format!("Thanks, {name}.");
                    booking.draft.name = FieldStatus::Valid(name);
                    self.advance(booking, &lead)
                }
                Err(e) => Ok(self.reprompt(booking.state, &e)),
            },
            BookingState::CollectingId => match validate_identifier(message) {
                Ok(id) => {
                    booking.draft.identifier = FieldStatus::Valid(id);
                    self.advance(booking, "Thank you.")
                }
                Err(e) => Ok(self.reprompt(booking.state, &e)),
            },
            BookingState::CollectingService => match validate_service(message) {
                Ok(service) => {
                    booking.draft.service = FieldStatus::Valid(service);
                    self.advance(booking, &format!("{service} therapy it is."))
                }
                Err(e) => Ok(self.reprompt(booking.state, &e)),
            },
            BookingState::CollectingDateTime => self.collect_datetime(booking, message).await,
            BookingState::CollectingEmail => match validate_email(message) {
                Ok(email) => {
                    booking.draft.email = FieldStatus::Valid(email);
                    self.advance(booking, "Got it.")
                }
                Err(e) => Ok(self.reprompt(booking.state, &e)),
            },
            BookingState::Confirming => self.confirm(booking, message).await,
            BookingState::Idle | BookingState::Committed | BookingState::Cancelled => {
                Ok(self.prompt(booking))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Date and time
    // -------------------------------------------------------------------------

    async fn collect_datetime(
        &self,
        booking: &mut BookingSession,
        message: &str,
    ) -> Result<String, BookingError> {
        if let Some(slot) = booking.draft.datetime.pending().copied() {
            if intent::is_retry(message) {
                return self.check_slot(booking, slot).await;
            }
        }

        let now = self.clock.now();
        let minutes = self.config.session_minutes;
        let parsed = parse_datetime(message, now)
            .and_then(|slot| validate_slot(slot, now, &self.hours, minutes).map(|()| slot));
        let slot = match parsed {
            Ok(slot) => slot,
            Err(e) => return Ok(self.reprompt(booking.state, &e)),
        };

        booking.draft.datetime = FieldStatus::Pending(slot);
        self.check_slot(booking, slot).await
    }

    async fn check_slot(
        &self,
        booking: &mut BookingSession,
        slot: chrono::NaiveDateTime,
    ) -> Result<String, BookingError> {
        let minutes = self.config.session_minutes;
        let result = bounded(
            Capability::Calendar,
            self.config.calendar_timeout(),
            self.calendar.find_conflict(slot, minutes),
        )
        .await;

        match result {
            Ok(false) => {
                booking.draft.datetime = FieldStatus::Valid(slot);
                self.advance(booking, &format!("{} is available.", format_slot(slot)))
            }
            Ok(true) => {
                booking.draft.datetime = FieldStatus::Unset;
                info!(%slot, "Requested slot is taken");
                Ok(format!(
                    "Sorry, {} is already taken. Could you suggest another date and time?",
                    format_slot(slot)
                ))
            }
            Err(e) => {
                warn!(error = %e, %slot, "Conflict check failed");
                Ok(format!(
                    "Sorry, I couldn't check the calendar just now. Reply \"retry\" to check {} \
                     again, or suggest a different date and time.",
                    format_slot(slot)
                ))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Confirmation and commit
    // -------------------------------------------------------------------------

    async fn confirm(
        &self,
        booking: &mut BookingSession,
        message: &str,
    ) -> Result<String, BookingError> {
        if intent::is_yes(message) {
            return self.commit(booking).await;
        }
        if intent::is_no(message) {
            booking.draft.datetime = FieldStatus::Unset;
            transition(booking, BookingState::CollectingDateTime)?;
            return Ok(format!("No problem. {}", self.prompt(booking)));
        }
        Ok(format!("Sorry, I didn't catch that. {}", self.prompt(booking)))
    }

    async fn commit(&self, booking: &mut BookingSession) -> Result<String, BookingError> {
        let Some(appointment) = booking.draft.to_appointment(self.config.session_minutes) else {
            warn!("Confirmation reached with an incomplete draft");
            return self.advance(booking, "A few details are still missing.");
        };

        let created = bounded(
            Capability::Calendar,
            self.config.calendar_timeout(),
            self.calendar.create_event(&appointment),
        )
        .await;

        let reference = match created {
            Ok(reference) => reference,
            Err(e) => {
                warn!(error = %e, "Calendar write failed; booking kept for retry");
                return Ok(commit_failed_message(&self.phone));
            }
        };

        transition(booking, BookingState::Committed)?;
        booking.reference = Some(reference.clone());
        info!(reference = %reference, service = %appointment.service, "Booking committed");

        let sent = bounded(
            Capability::Email,
            self.config.email_timeout(),
            self.email.send_confirmation(&appointment.email, &appointment),
        )
        .await;

        let email_sent = match sent {
            Ok(true) => true,
            Ok(false) => {
                warn!(reference = %reference, "Confirmation email was not delivered");
                false
            }
            Err(e) => {
                warn!(error = %e, reference = %reference, "Confirmation email failed");
                false
            }
        };

        Ok(committed_message(&appointment, &reference, email_sent))
    }

    // -------------------------------------------------------------------------
    // Prompts
    // -------------------------------------------------------------------------

    /// Move to the first state whose field is still missing and ask for it.
    fn advance(&self, booking: &mut BookingSession, lead: &str) -> Result<String, BookingError> {
        let next = booking.draft.next_state();
        transition(booking, next)?;
        Ok(format!("{lead} {}", self.prompt(booking)))
    }

    /// The question for the session's current state.
    fn prompt(&self, booking: &BookingSession) -> String {
        match booking.state {
            BookingState::CollectingName => "May I have your full name, please?".to_string(),
            BookingState::CollectingId => {
                "Please tell me your NRIC or FIN number (one letter, seven digits, then one letter)."
                    .to_string()
            }
            BookingState::CollectingService => format!(
                "Which service would you like? We offer {}.",
                ServiceKind::price_list()
            ),
            BookingState::CollectingDateTime => format!(
                "What date and time would you like? We're open {}. Sessions last {} minutes.",
                self.hours.summary(),
                self.config.session_minutes
            ),
            BookingState::CollectingEmail => {
                "What email address should I send the confirmation to?".to_string()
            }
            BookingState::Confirming => booking
                .draft
                .to_appointment(self.config.session_minutes)
                .map(|appointment| summary(&appointment))
                .unwrap_or_else(|| "Shall I confirm this booking? (yes/no)".to_string()),
            BookingState::Idle | BookingState::Committed | BookingState::Cancelled => {
                "Just say \"book\" whenever you'd like to make an appointment.".to_string()
            }
        }
    }

    /// Re-ask for the current field after rejected input.
    fn reprompt(&self, state: BookingState, err: &ValidationError) -> String {
        debug!(%state, error = %err, "Booking input rejected");
        match (state, err) {
            (BookingState::CollectingName, _) => {
                format!("Sorry, {err}. Please tell me your full name.")
            }
            (BookingState::CollectingId, _) => format!(
                "Sorry, {err}. Please enter it as one letter, seven digits and one letter, \
                 like Z1234567B."
            ),
            (BookingState::CollectingService, _) => format!(
                "Sorry, {err}. We offer {}. Which would you like?",
                ServiceKind::price_list()
            ),
            (BookingState::CollectingDateTime, _) => {
                let ask = match err {
                    ValidationError::ClosedDay(_) | ValidationError::OutsideHours => {
                        "Please choose another date and time."
                    }
                    ValidationError::InPast => "Please choose a future date and time.",
                    _ => "Please give me a date and a time, for example \"next Monday 10am\" or \"15 Aug 2pm\".",
                };
                format!(
                    "Sorry, {err}. Our opening hours are {}, and each session lasts {} minutes. {ask}",
                    self.hours.summary(),
                    self.config.session_minutes
                )
            }
            (BookingState::CollectingEmail, _) => format!(
                "Sorry, {err}. Please enter it like name@example.com."
            ),
            _ => format!("Sorry, {err}."),
        }
    }

    /// A rejected transition means the session is in a state the flow
    /// cannot continue from. Reset it so the next booking starts clean.
    fn fault(&self, booking: &mut BookingSession, err: BookingError) -> String {
        error!(error = %err, "Booking flow fault; resetting booking");
        *booking = BookingSession::default();
        "Sorry, something went wrong with this booking. Just say \"book\" to start again."
            .to_string()
    }
}

fn transition(booking: &mut BookingSession, to: BookingState) -> Result<(), BookingError> {
    validate_transition(booking.state, to)?;
    debug!(from = %booking.state, to = %to, "Booking transition");
    booking.state = to;
    Ok(())
}
