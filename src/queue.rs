//! Approval queue and decision resolver.
//!
//! Owns the shared map of pending items. Each suspended `submit()` call
//! awaits its own one-shot completion channel; the sender is removed
//! from the map together with its item, so approve, reject and the
//! expiry sweep race through a single atomic `remove` — exactly one of
//! them ever resolves a given id.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::models::approval::{ApprovalItem, ApprovalStatus, PendingSummary};
use crate::models::request::TransactionRequest;
use crate::notification::{ApprovalNotification, Notifier};
use crate::policy::PolicyConfig;
use crate::spend::DailySpendCounter;
use crate::store::snapshot::SnapshotStore;

/// How a `submit()` call was approved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmitOutcome {
    /// Passed the bounded-risk policy, never queued.
    AutoApproved,
    /// Queued, then approved by an operator decision.
    ManuallyApproved,
}

enum Resolution {
    Approved,
    Rejected,
    Expired,
}

struct PendingEntry {
    item: ApprovalItem,
    completion: oneshot::Sender<Resolution>,
}

pub struct ApprovalQueue {
    items: Arc<DashMap<Uuid, PendingEntry>>,
    spend: DailySpendCounter,
    config: PolicyConfig,
    notifier: Arc<dyn Notifier>,
    store: Arc<SnapshotStore>,
}

impl ApprovalQueue {
    pub fn new(config: PolicyConfig, notifier: Arc<dyn Notifier>, store: Arc<SnapshotStore>) -> Self {
        Self {
            items: Arc::new(DashMap::new()),
            spend: DailySpendCounter::new(),
            config,
            notifier,
            store,
        }
    }

    /// Admit a transaction.
    ///
    /// Auto-approves and returns immediately when the policy is
    /// satisfied (the daily counter is reserved atomically with the
    /// check). Otherwise the request is queued, persisted, dispatched
    /// to the operator channel, and the call suspends until exactly one
    /// of approve / reject / expiry resolves it.
    pub async fn submit(&self, request: TransactionRequest) -> Result<SubmitOutcome, GatewayError> {
        if self.spend.evaluate_and_reserve(&request, &self.config) {
            info!(
                value = %request.value,
                operation = %request.operation,
                spent_today = %self.spend.spent_today(),
                "transaction auto-approved within policy"
            );
            return Ok(SubmitOutcome::AutoApproved);
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let item = ApprovalItem {
            id,
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at: now + self.config.expiry,
            request,
            notification_ref: None,
        };
        let payload = ApprovalNotification::for_item(&item);
        let (tx, rx) = oneshot::channel();

        info!(
            id = %id,
            operation = %item.request.operation,
            value = %item.request.value,
            expires_at = %item.expires_at,
            "transaction queued for manual approval"
        );
        self.items.insert(id, PendingEntry { item, completion: tx });
        self.persist();
        self.dispatch_notification(id, payload);

        match rx.await {
            Ok(Resolution::Approved) => Ok(SubmitOutcome::ManuallyApproved),
            Ok(Resolution::Rejected) => Err(GatewayError::ManualRejected),
            Ok(Resolution::Expired) => Err(GatewayError::Expired),
            Err(_) => Err(GatewayError::Internal(anyhow::anyhow!(
                "approval queue dropped before resolution"
            ))),
        }
    }

    /// Operator approval. `AlreadyResolved` on an unknown or terminal
    /// id; `Expired` when the deadline has already passed (the caller
    /// is completed with the timeout outcome either way).
    pub fn approve(&self, id: Uuid) -> Result<(), GatewayError> {
        self.resolve(id, Resolution::Approved)
    }

    /// Operator rejection, symmetric to [`approve`](Self::approve).
    pub fn reject(&self, id: Uuid) -> Result<(), GatewayError> {
        self.resolve(id, Resolution::Rejected)
    }

    fn resolve(&self, id: Uuid, resolution: Resolution) -> Result<(), GatewayError> {
        // Removing the entry is the single-assignment point: the winner
        // of any approve/reject/expire race holds the only completion
        // sender, later attempts see an absent entry.
        let (_, entry) = self.items.remove(&id).ok_or(GatewayError::AlreadyResolved)?;

        if Utc::now() > entry.item.expires_at {
            // Past the deadline the decision is void; the caller gets
            // the same timeout outcome the sweep would have delivered.
            warn!(id = %id, "decision arrived after expiry deadline");
            let _ = entry.completion.send(Resolution::Expired);
            self.persist();
            return Err(GatewayError::Expired);
        }

        let status = match resolution {
            Resolution::Approved => ApprovalStatus::Approved,
            Resolution::Rejected => ApprovalStatus::Rejected,
            Resolution::Expired => ApprovalStatus::Expired,
        };
        info!(id = %id, status = ?status, "approval resolved");
        if entry.completion.send(resolution).is_err() {
            warn!(id = %id, "suspended caller went away before resolution");
        }
        self.persist();
        Ok(())
    }

    /// Read-only snapshot of pending items. No side effects.
    pub fn list_pending(&self) -> Vec<PendingSummary> {
        let now = Utc::now();
        let mut pending: Vec<PendingSummary> = self
            .items
            .iter()
            .map(|e| {
                let item = &e.value().item;
                PendingSummary {
                    id: item.id,
                    operation: item.request.operation.clone(),
                    destination: item.request.to.clone(),
                    value: item.request.value,
                    minutes_remaining: (item.expires_at - now).num_minutes().max(0),
                }
            })
            .collect();
        pending.sort_by_key(|p| p.id);
        pending
    }

    /// Expire every pending item past its deadline. Returns the count
    /// processed. Races with manual decisions are settled by the same
    /// atomic remove as [`resolve`](Self::resolve).
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let due: Vec<Uuid> = self
            .items
            .iter()
            .filter(|e| now > e.value().item.expires_at)
            .map(|e| e.value().item.id)
            .collect();

        let mut processed = 0;
        for id in due {
            if let Some((_, entry)) = self.items.remove(&id) {
                info!(id = %id, "approval expired without a decision");
                let _ = entry.completion.send(Resolution::Expired);
                processed += 1;
            }
        }
        if processed > 0 {
            self.persist();
        }
        processed
    }

    /// Number of currently pending items.
    pub fn pending_len(&self) -> usize {
        self.items.len()
    }

    /// Today's cumulative auto-approved value.
    pub fn spent_today(&self) -> rust_decimal::Decimal {
        self.spend.spent_today()
    }

    /// Overwrite the durable snapshot with the current pending set.
    /// Spawned so resolution never waits on disk I/O; a failed write is
    /// logged and tolerated per the discard-on-restart policy.
    fn persist(&self) {
        let mut items: Vec<ApprovalItem> = self
            .items
            .iter()
            .map(|e| e.value().item.clone())
            .collect();
        items.sort_by_key(|i| i.created_at);

        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.persist(&items).await {
                // accepted degradation: in-memory state stays correct,
                // and restart discards whatever the snapshot missed
                warn!(error = %GatewayError::Persistence(e.to_string()), "snapshot write failed");
            }
        });
    }

    fn dispatch_notification(&self, id: Uuid, payload: ApprovalNotification) {
        let notifier = self.notifier.clone();
        let items = self.items.clone();
        tokio::spawn(async move {
            match notifier.send_approval_request(&payload).await {
                Ok(Some(delivery_ref)) => {
                    if let Some(mut entry) = items.get_mut(&id) {
                        entry.item.notification_ref = Some(delivery_ref);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // Non-fatal: the item stays pending and resolvable
                    // through the operator API until it expires.
                    let err = GatewayError::ChannelUnavailable(e.to_string());
                    warn!(id = %id, error = %err, "operator notification failed");
                }
            }
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────
