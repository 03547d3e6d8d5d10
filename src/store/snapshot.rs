//! Durable snapshot of pending approvals for crash recovery.
//!
//! Every state transition overwrites the full snapshot (no append log).
//! On startup the prior snapshot is loaded and deliberately discarded:
//! the completion handles of reloaded items are gone, so they are
//! structurally unresolvable. Callers of abandoned items must re-submit.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::models::approval::ApprovalItem;

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Overwrite the snapshot with the given pending items.
    ///
    /// Idempotent and safe to call repeatedly and concurrently: the
    /// payload is written to a temp file and renamed into place, so
    /// readers never observe a partial snapshot.
    pub async fn persist(&self, items: &[ApprovalItem]) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(items).context("failed to serialize snapshot")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("failed to write snapshot to {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to move snapshot into {}", self.path.display()))?;
        debug!(count = items.len(), path = %self.path.display(), "pending snapshot written");
        Ok(())
    }

    /// Load the prior snapshot, discard its items, and persist an empty
    /// one. Returns how many items were abandoned.
    pub async fn recover(&self) -> anyhow::Result<usize> {
        let discarded = match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let items: Vec<ApprovalItem> = serde_json::from_slice(&bytes)
                    .with_context(|| format!("corrupt snapshot at {}", self.path.display()))?;
                items.len()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read snapshot at {}", self.path.display())
                })
            }
        };

        if discarded > 0 {
            warn!(
                discarded,
                "discarding unresolvable approvals from previous run; callers must re-submit"
            );
        }
        self.persist(&[]).await?;
        Ok(discarded)
    }
}

// ── Tests ─────────────────────────────────────────────────────
