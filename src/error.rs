//! Error taxonomy for the check-in engine.
//!
//! Admin-side failures (`ConfigError`) and kiosk-side failures (`SessionError`) are
//! returned as values; nothing in the engine panics across a component boundary.
//! Side-effect failures never surface as `Err` from the state machine, they are
//! collected on the `CompletionRecord` instead.

use thiserror::Error;

use crate::buttons::ButtonId;
use crate::session::validation::ValidationErrors;

/// Errors raised by the admin console stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("Invalid field: {reason}")]
    InvalidField { reason: String },
    #[error("Invalid reorder: {reason}")]
    InvalidReorder { reason: String },
}

impl ConfigError {
    pub(crate) fn button_not_found(id: &ButtonId) -> Self {
        ConfigError::NotFound {
            kind: "button",
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_field(reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            reason: reason.into(),
        }
    }
}

/// Errors raised while driving a kiosk session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Recoverable: the visitor corrects the listed fields and retries.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    /// Fatal to the session: the kiosk returns to the welcome screen.
    #[error("Button {button_id} is no longer configured")]
    ConfigRemoved { button_id: ButtonId },
    #[error("Button {button_id} is disabled")]
    ButtonDisabled { button_id: ButtonId },
    #[error("Session has already finished")]
    SessionFinished,
    #[error("No active session")]
    NoActiveSession,
}

impl SessionError {
    /// True when the kiosk should drop the session and show the welcome screen.
    pub fn routes_to_welcome(&self) -> bool {
        matches!(
            self,
            SessionError::ConfigRemoved { .. }
                | SessionError::ButtonDisabled { .. }
                | SessionError::NoActiveSession
        )
    }
}
