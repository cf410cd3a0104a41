use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::buttons::ButtonId;
use crate::config::ObservabilityConfig;
use crate::session::SessionId;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set. JSON output carries the
/// current span and span list so every line can be tied back to its session.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&observability.log_level))?;

    if observability.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().compact().with_target(false))
            .with(filter)
            .try_init()?;
    }

    tracing::debug!(json = observability.json_logs, "Kiosk telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping everything one visitor does at the kiosk
pub fn create_session_span(
    session_id: SessionId,
    button_id: ButtonId,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "kiosk_session",
        session.id = %session_id,
        button.id = %button_id,
        correlation.id = correlation_id,
    )
}
