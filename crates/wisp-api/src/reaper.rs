use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use wisp_db::StoreError;
use wisp_db::models::SweepReport;

use crate::state::{AppState, AppStateInner};

/// Sweep storage and forget stale rate-limit entries.
pub fn sweep(state: &AppStateInner, now: DateTime<Utc>) -> Result<SweepReport, StoreError> {
    let report = state.db.sweep(now)?;
    let evicted = state.limiter.evict_stale(Instant::now());

    if !report.is_empty() {
        info!(
            "Sweep: removed {} notes, {} rooms, {} messages",
            report.secrets, report.rooms, report.messages
        );
    }
    if evicted > 0 {
        debug!("Sweep: evicted {} rate-limit entries", evicted);
    }

    Ok(report)
}

/// Sweep from a request path. A failure is logged and never fails the request.
pub fn sweep_quietly(state: &AppStateInner, now: DateTime<Utc>) {
    if let Err(e) = sweep(state, now) {
        warn!("Sweep error: {}", e);
    }
}

/// Sweep with the configured probability. Returns whether a sweep ran.
pub fn maybe_sweep(state: &AppStateInner, now: DateTime<Utc>) -> bool {
    if rand::random::<f64>() < state.settings.sweep_probability {
        sweep_quietly(state, now);
        true
    } else {
        false
    }
}

/// Background task that sweeps on a fixed interval.
pub async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let state = state.clone();
        match tokio::task::spawn_blocking(move || sweep(&state, Utc::now())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Sweep error: {}", e),
            Err(e) => warn!("Sweep task failed: {}", e),
        }
    }
}
