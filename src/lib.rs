// Kiosk Check-in Library - configurable visitor and delivery check-in
// This exposes the core components for the kiosk binary and for integration

pub mod buttons;
pub mod completion;
pub mod config;
pub mod error;
pub mod preview;
pub mod repository;
pub mod session;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use buttons::{
    ButtonConfig, ButtonConfigStore, ButtonIcon, ButtonId, ButtonLease, ButtonPatch, ButtonType,
    NewButton, VisitType,
};
pub use completion::{
    BadgePayload, BadgePrinter, CompletionDispatcher, CompletionRecord, NotificationPayload,
    NotificationService, PhotoCaptureService, PhotoRef, SideEffect, SideEffectFailure,
};
pub use config::{config, init_config, KioskEngineConfig};
pub use error::{ConfigError, SessionError};
pub use preview::{preview_buttons, render_grid, ButtonPreview};
pub use repository::{
    CatalogSnapshot, ConfigRepository, InMemoryRepository, JsonFileRepository, RepositoryError,
};
pub use session::{
    spawn_idle_watchdog, Advance, CancelReason, CheckInSession, CompletionRequest, FieldError,
    Kiosk, SessionId, SessionStatus, StepView, ValidationErrors,
};
pub use telemetry::{create_session_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    resolve, ContactLayout, CustomField, CustomFieldId, FieldFlags, FieldKey, FieldSpec,
    NotifyPolicy, StandardField, Step, StepKind, WorkflowConfig, WorkflowConfigStore,
    WorkflowOptions, WorkflowResolver,
};
