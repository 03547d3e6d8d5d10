//! Operator notification channel abstraction.
//!
//! The gateway only depends on the [`Notifier`] trait; the concrete
//! transport (a webhook post, see [`webhook`]) is an external
//! collaborator. Delivery failure is never fatal — a pending item stays
//! resolvable through the operator API until it expires.

pub mod webhook;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::models::approval::ApprovalItem;
use crate::policy::{self, CalldataSelector};

/// How many hex chars of calldata to show in the operator summary
/// (32 bytes).
const CALLDATA_PREVIEW_CHARS: usize = 64;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an approval request to the operator channel.
    ///
    /// Returns `Ok(Some(ref))` with an opaque delivery reference on
    /// success, `Ok(None)` when no channel is configured.
    async fn send_approval_request(
        &self,
        payload: &ApprovalNotification,
    ) -> anyhow::Result<Option<String>>;
}

// ── Notification Payload ──────────────────────────────────────

/// Human-readable summary of a queued transaction, with the two
/// callback tokens the operator channel can post back.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalNotification {
    pub title: String,
    pub id: Uuid,
    pub operation: String,
    pub destination: Option<String>,
    pub value: Decimal,
    /// Decoded function name if the selector is known, else the raw
    /// selector, else "(no calldata)".
    pub function: String,
    pub calldata_preview: Option<String>,
    pub minutes_remaining: i64,
    pub approve_token: String,
    pub reject_token: String,
}

impl ApprovalNotification {
    pub fn for_item(item: &ApprovalItem) -> Self {
        let function = match policy::leading_selector(item.request.data.as_deref()) {
            CalldataSelector::Absent => "(no calldata)".to_string(),
            CalldataSelector::Selector(sel) => policy::selector_name(&sel)
                .map(String::from)
                .unwrap_or_else(|| format!("0x{sel}")),
            CalldataSelector::Malformed => "(malformed calldata)".to_string(),
        };

        let calldata_preview = item.request.data.as_deref().map(|d| {
            let raw = d.trim_start_matches("0x");
            match raw.get(..CALLDATA_PREVIEW_CHARS) {
                Some(head) if raw.len() > CALLDATA_PREVIEW_CHARS => format!("0x{head}…"),
                _ => format!("0x{raw}"),
            }
        });

        Self {
            title: "Transaction approval required".to_string(),
            id: item.id,
            operation: item.request.operation.clone(),
            destination: item.request.to.clone(),
            value: item.request.value,
            function,
            calldata_preview,
            minutes_remaining: (item.expires_at - Utc::now()).num_minutes().max(0),
            approve_token: format!("approve:{}", item.id),
            reject_token: format!("reject:{}", item.id),
        }
    }
}

// ── Inbound Callbacks ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallbackDecision {
    Approve,
    Reject,
}

/// Parse an inbound `approve:<id>` / `reject:<id>` callback token.
pub fn parse_callback(token: &str) -> Result<(CallbackDecision, Uuid), GatewayError> {
    let (action, id) = token
        .split_once(':')
        .ok_or_else(|| GatewayError::InvalidRequest(format!("malformed callback token: {token}")))?;

    let id = Uuid::parse_str(id.trim())
        .map_err(|_| GatewayError::InvalidRequest(format!("callback token has invalid id: {token}")))?;

    match action.trim() {
        "approve" => Ok((CallbackDecision::Approve, id)),
        "reject" => Ok((CallbackDecision::Reject, id)),
        other => Err(GatewayError::InvalidRequest(format!(
            "unknown callback action: {other}"
        ))),
    }
}

// ── Tests ─────────────────────────────────────────────────────
