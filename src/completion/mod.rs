pub mod dispatcher;
pub mod services;

pub use dispatcher::{CompletionDispatcher, CompletionRecord, SideEffect, SideEffectFailure};
pub use services::{
    BadgePayload, BadgePrinter, LoggingBadgePrinter, LoggingNotifier, LoggingPhotoCapture,
    NotificationPayload, NotificationService, PhotoCaptureService, PhotoRef,
};
