//! Boundary traits for the kiosk's external collaborators.
//!
//! Camera, badge printer and notification delivery live outside the engine.
//! Production deployments plug real adapters in; the `Logging*` adapters only
//! record what would have happened and back the CLI.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::buttons::VisitType;

/// Opaque reference to a stored visitor photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(pub String);

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgePayload {
    pub visitor_name: String,
    pub company: Option<String>,
    pub host: Option<String>,
    pub visit_type: Option<VisitType>,
    pub button_label: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub subject: String,
    pub body: String,
    pub session_id: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PhotoCaptureService: Send + Sync {
    async fn capture(&self) -> Result<PhotoRef>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BadgePrinter: Send + Sync {
    async fn print(&self, badge: &BadgePayload) -> Result<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify(&self, target: &str, payload: &NotificationPayload) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPhotoCapture;

#[async_trait]
impl PhotoCaptureService for LoggingPhotoCapture {
    async fn capture(&self) -> Result<PhotoRef> {
        let photo = PhotoRef(format!("photo-{}", Uuid::new_v4()));
        info!(photo = %photo, "Photo captured");
        Ok(photo)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBadgePrinter;

#[async_trait]
impl BadgePrinter for LoggingBadgePrinter {
    async fn print(&self, badge: &BadgePayload) -> Result<()> {
        info!(
            visitor = %badge.visitor_name,
            host = ?badge.host,
            visit_type = ?badge.visit_type,
            "Badge printed"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl NotificationService for LoggingNotifier {
    async fn notify(&self, target: &str, payload: &NotificationPayload) -> Result<()> {
        info!(target_contact = %target, subject = %payload.subject, "Notification sent");
        Ok(())
    }
}
