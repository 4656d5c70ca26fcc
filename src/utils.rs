//! Utility functions.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const CLOCK_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Render an epoch-millisecond timestamp as an HH:MM:SS display string.
pub fn format_clock(timestamp_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(timestamp_ms as i128 * 1_000_000)
        .ok()
        .and_then(|t| t.format(CLOCK_FORMAT).ok())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Wait for SIGINT or SIGTERM for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
