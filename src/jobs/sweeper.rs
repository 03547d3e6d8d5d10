//! Background job: expire pending approvals past their deadline.
//!
//! Runs on a fixed interval (default 60s, configurable via
//! `TXGATE_SWEEP_INTERVAL`). Double resolution against a racing manual
//! decision is prevented by the queue's single-assignment discipline.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::queue::ApprovalQueue;

/// Spawn the expiry sweep task. Call this once at startup.
pub fn spawn(queue: Arc<ApprovalQueue>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(interval_secs.max(1)));
        // the first tick completes immediately; skip it so we sweep
        // only after a full interval has elapsed
        interval.tick().await;
        loop {
            interval.tick().await;
            let expired = queue.sweep_expired();
            if expired > 0 {
                tracing::info!(expired, "expiry sweep resolved overdue approvals");
            }
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────
