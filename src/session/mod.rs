// Kiosk-side session handling

pub mod kiosk;
pub mod machine;
pub mod validation;

pub use kiosk::{spawn_idle_watchdog, Kiosk};
pub use machine::{
    Advance, CancelReason, CheckInSession, CompletionRequest, SessionId, SessionStatus, StepView,
};
pub use validation::{is_valid_email, validate_step, FieldError, ValidationErrors};
