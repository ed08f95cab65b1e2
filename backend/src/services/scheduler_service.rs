//! Background task scheduler.
//!
//! The retention sweep is normally triggered over HTTP by an external cron
//! caller. When `RETENTION_SWEEP_INTERVAL_SECS` is set it also runs here.

use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::config::Config;
use crate::services::retention_service::RetentionService;

/// Spawn the periodic retention sweep, if configured. Fire-and-forget.
pub fn spawn_all(retention: Arc<RetentionService>, config: &Config) {
    let Some(every) = config.retention_sweep_interval_secs else {
        tracing::debug!("Scheduled retention sweep disabled");
        return;
    };
    let threshold = config.retention_threshold_secs();

    tokio::spawn(async move {
        // Initial delay to let the server start up
        tokio::time::sleep(Duration::from_secs(30)).await;
        let mut ticker = interval(Duration::from_secs(every));

        loop {
            ticker.tick().await;
            tracing::debug!("Running scheduled retention sweep");
            if let Err(e) = retention.sweep(threshold).await {
                tracing::warn!("Scheduled retention sweep failed: {}", e);
            }
        }
    });

    tracing::info!(interval_secs = every, threshold_secs = threshold, "Scheduled retention sweep enabled");
}
