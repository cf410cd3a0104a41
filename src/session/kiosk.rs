//! Single-kiosk driver.
//!
//! The kiosk holds at most one session. It routes visitor input to that
//! session, resets it after inactivity, and hands completed sessions to the
//! completion dispatcher before returning to the welcome screen.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, Span};

use crate::buttons::{ButtonConfigStore, ButtonId, VisitType};
use crate::completion::{CompletionDispatcher, CompletionRecord};
use crate::error::SessionError;
use crate::session::machine::{Advance, CancelReason, CheckInSession, SessionId, StepView};
use crate::telemetry::{create_session_span, generate_correlation_id};
use crate::workflow::{FieldKey, WorkflowResolver};

struct ActiveSession {
    session: CheckInSession,
    span: Span,
}

pub struct Kiosk {
    buttons: Arc<ButtonConfigStore>,
    resolver: WorkflowResolver,
    dispatcher: Arc<CompletionDispatcher>,
    idle_timeout: Duration,
    active: Option<ActiveSession>,
    last_activity: Instant,
    records_tx: UnboundedSender<CompletionRecord>,
    records_rx: UnboundedReceiver<CompletionRecord>,
}

impl Kiosk {
    pub fn new(
        buttons: Arc<ButtonConfigStore>,
        resolver: WorkflowResolver,
        dispatcher: Arc<CompletionDispatcher>,
        idle_timeout: Duration,
    ) -> Self {
        let (records_tx, records_rx) = unbounded_channel();
        Self {
            buttons,
            resolver,
            dispatcher,
            idle_timeout,
            active: None,
            last_activity: Instant::now(),
            records_tx,
            records_rx,
        }
    }

    pub fn buttons(&self) -> &Arc<ButtonConfigStore> {
        &self.buttons
    }

    /// True while the welcome grid is showing
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn session(&self) -> Option<&CheckInSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn current_step(&self) -> Option<StepView<'_>> {
        self.session().map(CheckInSession::current_step)
    }

    /// Begin a check-in for `button_id`, replacing any unfinished session.
    ///
    /// Must be called from within a tokio runtime: a workflow with nothing to
    /// ask completes on the spot and its side effects are spawned immediately.
    pub fn start_session(&mut self, button_id: ButtonId) -> Result<SessionId, SessionError> {
        self.touch();
        if let Some(mut previous) = self.active.take() {
            let _entered = previous.span.enter();
            previous.session.cancel(CancelReason::Superseded);
        }

        let (button, workflow, lease) = self.buttons.checkout(&button_id).map_err(|e| {
            debug!(error = %e, "Pressed button is gone");
            SessionError::ConfigRemoved { button_id }
        })?;
        if !button.is_enabled {
            info!(button_id = %button_id, "Disabled button pressed");
            return Err(SessionError::ButtonDisabled { button_id });
        }

        let session = CheckInSession::start(button, workflow, lease, &self.resolver);
        let id = session.id();
        let span = create_session_span(id, button_id, &generate_correlation_id());
        self.active = Some(ActiveSession { session, span });
        self.finish_if_completed();
        Ok(id)
    }

    pub fn set_value(&mut self, key: FieldKey, value: impl Into<String>) -> Result<(), SessionError> {
        let value = value.into();
        self.with_session(|session| session.set_value(key, value))
    }

    pub fn set_visit_type(&mut self, visit_type: VisitType) -> Result<(), SessionError> {
        self.with_session(|session| session.set_visit_type(visit_type))
    }

    /// Advance the active session; on `Completed` the side effects start and the kiosk goes idle
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        let outcome = self.with_session(CheckInSession::advance)?;
        if outcome == Advance::Completed {
            self.finish_if_completed();
        }
        Ok(outcome)
    }

    pub fn retreat(&mut self) -> Result<StepView<'_>, SessionError> {
        self.touch();
        let active = self.active.as_mut().ok_or(SessionError::NoActiveSession)?;
        let _entered = active.span.enter();
        Ok(active.session.retreat())
    }

    /// Visitor pressed cancel; returns to the welcome screen
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.touch();
        let mut active = self.active.take().ok_or(SessionError::NoActiveSession)?;
        let _entered = active.span.enter();
        active.session.cancel(CancelReason::Visitor);
        Ok(())
    }

    /// Cancel the session when no input arrived within the idle timeout.
    ///
    /// Returns true if a session was reset.
    pub fn expire_if_idle(&mut self, now: Instant) -> bool {
        if self.active.is_none() || now.saturating_duration_since(self.last_activity) < self.idle_timeout {
            return false;
        }
        if let Some(mut active) = self.active.take() {
            let _entered = active.span.enter();
            active.session.cancel(CancelReason::IdleTimeout);
        }
        true
    }

    /// Completion records that have arrived since the last call
    pub fn drain_completions(&mut self) -> Vec<CompletionRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.records_rx.try_recv() {
            records.push(record);
        }
        records
    }

    /// Dismissible banners for side effects that failed
    pub fn drain_banners(&mut self) -> Vec<String> {
        self.drain_completions()
            .iter()
            .flat_map(|record| record.banners())
            .collect()
    }

    /// Wait for the next completion record
    pub async fn next_completion(&mut self) -> Option<CompletionRecord> {
        self.records_rx.recv().await
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn with_session<T>(
        &mut self,
        input: impl FnOnce(&mut CheckInSession) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        self.touch();
        let active = self.active.as_mut().ok_or(SessionError::NoActiveSession)?;
        let outcome = {
            let _entered = active.span.enter();
            input(&mut active.session)
        };
        if let Err(e) = &outcome {
            if e.routes_to_welcome() {
                self.active = None;
            }
        }
        outcome
    }

    fn finish_if_completed(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(request) = active.session.take_completion() else {
            return;
        };
        let _handle = {
            let _entered = active.span.enter();
            self.dispatcher.spawn(request, self.records_tx.clone())
        };
        self.active = None;
    }
}

/// Poll `expire_if_idle` until the kiosk is dropped
pub fn spawn_idle_watchdog(kiosk: &Arc<Mutex<Kiosk>>, poll: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(kiosk);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll);
        loop {
            ticker.tick().await;
            let Some(shared) = weak.upgrade() else {
                break;
            };
            let mut kiosk = shared.lock().await;
            if kiosk.expire_if_idle(Instant::now()) {
                info!("Idle session reset to welcome screen");
            }
        }
    })
}
