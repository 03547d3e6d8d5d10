use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::request::TransactionRequest;

/// A queued decision request awaiting manual resolution.
///
/// This is the snapshot-serializable part of a pending approval. The
/// one-shot completion handle lives next to it inside the queue and is
/// never serialized — any item reloaded from disk is structurally
/// unresolvable and gets discarded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalItem {
    pub id: Uuid,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub request: TransactionRequest,
    pub notification_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

/// Read-only view of a pending item for the operator list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PendingSummary {
    pub id: Uuid,
    pub operation: String,
    pub destination: Option<String>,
    pub value: Decimal,
    pub minutes_remaining: i64,
}
