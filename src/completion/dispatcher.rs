//! Terminal-step side effects.
//!
//! Photo acknowledgment, badge print and notification run concurrently and are
//! fire-and-forget from the kiosk's point of view. A failure becomes a banner
//! on the `CompletionRecord`; it never takes the session out of `Success`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::buttons::{ButtonId, ButtonType};
use crate::completion::services::*;
use crate::session::machine::{CompletionRequest, SessionId};
use crate::workflow::{FieldKey, NotifyPolicy, StandardField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    PhotoCapture,
    BadgePrint,
    Notification,
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideEffect::PhotoCapture => f.write_str("photo capture"),
            SideEffect::BadgePrint => f.write_str("badge printing"),
            SideEffect::Notification => f.write_str("host notification"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{effect} failed: {message}")]
pub struct SideEffectFailure {
    pub effect: SideEffect,
    pub message: String,
}

/// Outcome of the completion side effects for one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub session_id: SessionId,
    pub button_id: ButtonId,
    pub completed_at: DateTime<Utc>,
    pub photo: Option<PhotoRef>,
    pub badge_printed: bool,
    pub notified: Option<String>,
    pub failures: Vec<SideEffectFailure>,
}

impl CompletionRecord {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Dismissible banner text, one per failed side effect
    pub fn banners(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|failure| match failure.effect {
                SideEffect::PhotoCapture => {
                    "We couldn't take your photo. Please see the front desk.".to_string()
                }
                SideEffect::BadgePrint => {
                    "Your badge didn't print. Please see the front desk.".to_string()
                }
                SideEffect::Notification => {
                    "We couldn't reach your contact. The front desk will let them know."
                        .to_string()
                }
            })
            .collect()
    }
}

pub struct CompletionDispatcher {
    photo: Arc<dyn PhotoCaptureService>,
    badge: Arc<dyn BadgePrinter>,
    notifier: Arc<dyn NotificationService>,
    timeout: Duration,
}

impl fmt::Debug for CompletionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionDispatcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CompletionDispatcher {
    pub fn new(
        photo: Arc<dyn PhotoCaptureService>,
        badge: Arc<dyn BadgePrinter>,
        notifier: Arc<dyn NotificationService>,
        timeout: Duration,
    ) -> Self {
        Self {
            photo,
            badge,
            notifier,
            timeout,
        }
    }

    /// Dispatcher backed by the logging adapters
    pub fn logging(timeout: Duration) -> Self {
        Self::new(
            Arc::new(LoggingPhotoCapture),
            Arc::new(LoggingBadgePrinter),
            Arc::new(LoggingNotifier),
            timeout,
        )
    }

    /// Run every configured side effect concurrently and collect the outcome
    pub async fn dispatch(&self, request: &CompletionRequest) -> CompletionRecord {
        let options = request.options;

        let photo = async {
            if !options.capture_photo {
                return None;
            }
            Some(guarded(SideEffect::PhotoCapture, self.timeout, self.photo.capture()).await)
        };
        let badge = async {
            if !options.print_badge {
                return None;
            }
            let payload = badge_payload(request);
            Some(guarded(SideEffect::BadgePrint, self.timeout, self.badge.print(&payload)).await)
        };
        let notification = async {
            let Some(target) = notification_target(request) else {
                debug!(session_id = %request.session_id, "No notification target");
                return None;
            };
            let payload = notification_payload(request);
            let outcome = guarded(
                SideEffect::Notification,
                self.timeout,
                self.notifier.notify(&target, &payload),
            )
            .await;
            Some(outcome.map(|_| target))
        };

        let (photo, badge, notification) = tokio::join!(photo, badge, notification);

        let mut failures = Vec::new();
        let photo = settle(photo, &mut failures);
        let badge_printed = settle(badge, &mut failures).is_some();
        let notified = settle(notification, &mut failures);

        let record = CompletionRecord {
            session_id: request.session_id,
            button_id: request.button.id,
            completed_at: request.completed_at,
            photo,
            badge_printed,
            notified,
            failures,
        };
        info!(
            session_id = %record.session_id,
            badge_printed = record.badge_printed,
            notified = record.notified.is_some(),
            failures = record.failures.len(),
            "Completion side effects finished"
        );
        record
    }

    /// Fire-and-forget: the record arrives on `records` when every effect has settled
    pub fn spawn(
        self: &Arc<Self>,
        request: CompletionRequest,
        records: UnboundedSender<CompletionRecord>,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        let span = tracing::info_span!("completion", session.id = %request.session_id);
        tokio::spawn(
            async move {
                let record = dispatcher.dispatch(&request).await;
                if records.send(record).is_err() {
                    debug!("Completion record receiver dropped");
                }
            }
            .instrument(span),
        )
    }
}

async fn guarded<T>(
    effect: SideEffect,
    timeout: Duration,
    call: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, SideEffectFailure> {
    let outcome = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}ms", timeout.as_millis()),
    };
    warn!(effect = %effect, error = %outcome, "Completion side effect failed");
    Err(SideEffectFailure {
        effect,
        message: outcome,
    })
}

fn settle<T>(
    outcome: Option<Result<T, SideEffectFailure>>,
    failures: &mut Vec<SideEffectFailure>,
) -> Option<T> {
    match outcome? {
        Ok(value) => Some(value),
        Err(failure) => {
            failures.push(failure);
            None
        }
    }
}

/// Host for visits, recipient for deliveries, or the fixed contact
pub fn notification_target(request: &CompletionRequest) -> Option<String> {
    match &request.notify {
        NotifyPolicy::SpecificContact { contact } => Some(contact.clone()),
        NotifyPolicy::EmployeeSearch => {
            let key = match request.button.button_type {
                ButtonType::Delivery => FieldKey::Recipient,
                _ => FieldKey::Standard(StandardField::Host),
            };
            request.value(&key).map(str::to_string)
        }
    }
}

fn visitor_name(request: &CompletionRequest) -> String {
    request
        .value(&FieldKey::Standard(StandardField::FullName))
        .or_else(|| request.value(&FieldKey::Courier))
        .unwrap_or("Visitor")
        .to_string()
}

pub fn badge_payload(request: &CompletionRequest) -> BadgePayload {
    let owned = |key: FieldKey| request.value(&key).map(str::to_string);
    BadgePayload {
        visitor_name: visitor_name(request),
        company: owned(FieldKey::Standard(StandardField::Company)),
        host: owned(FieldKey::Standard(StandardField::Host)),
        visit_type: request.visit_type,
        button_label: request.button.label.clone(),
        issued_at: request.completed_at,
    }
}

fn notification_payload(request: &CompletionRequest) -> NotificationPayload {
    let visitor = visitor_name(request);
    let (subject, body) = match request.button.button_type {
        ButtonType::Delivery => (
            "A delivery has arrived for you".to_string(),
            format!("{visitor} dropped off a delivery at reception."),
        ),
        _ => (
            format!("{visitor} has arrived"),
            format!("{visitor} checked in via \"{}\".", request.button.label),
        ),
    };
    NotificationPayload {
        subject,
        body,
        session_id: request.session_id.to_string(),
    }
}
