//! Operator-facing HTTP API.
//!
//! This is the "other listed interface": when notification delivery
//! fails, pending items remain resolvable here until they expire.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::models::approval::PendingSummary;
use crate::models::request::TransactionRequest;
use crate::notification::{self, CallbackDecision};
use crate::queue::{ApprovalQueue, SubmitOutcome};

pub struct AppState {
    pub queue: Arc<ApprovalQueue>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/transactions", post(submit_transaction))
        .route("/api/v1/approvals", get(list_approvals))
        .route("/api/v1/approvals/:id/decision", post(decide_approval))
        .route("/api/v1/callbacks", post(handle_callback))
        .with_state(state)
}

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: String, // "approve" | "reject"
}

#[derive(Serialize)]
pub struct DecisionResponse {
    pub id: Uuid,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CallbackRequest {
    pub token: String,
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /api/v1/transactions — admit a transaction; suspends until a
/// terminal decision when manual review is required.
pub async fn submit_transaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let outcome = state.queue.submit(request).await?;
    let mode = match outcome {
        SubmitOutcome::AutoApproved => "auto",
        SubmitOutcome::ManuallyApproved => "manual",
    };
    Ok(Json(json!({ "status": "approved", "mode": mode })))
}

/// GET /api/v1/approvals — list pending items with remaining time
pub async fn list_approvals(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<PendingSummary>> {
    Json(state.queue.list_pending())
}

/// POST /api/v1/approvals/:id/decision — approve or reject a request
pub async fn decide_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<(StatusCode, Json<DecisionResponse>), GatewayError> {
    let status = match payload.decision.as_str() {
        "approve" => {
            state.queue.approve(id)?;
            "approved"
        }
        "reject" => {
            state.queue.reject(id)?;
            "rejected"
        }
        other => {
            tracing::warn!("decide_approval: invalid decision: {}", other);
            return Err(GatewayError::InvalidRequest(format!(
                "decision must be \"approve\" or \"reject\", got \"{other}\""
            )));
        }
    };

    Ok((
        StatusCode::OK,
        Json(DecisionResponse {
            id,
            status: status.to_string(),
        }),
    ))
}

/// POST /api/v1/callbacks — route an `approve:<id>` / `reject:<id>`
/// token coming back from the operator channel.
pub async fn handle_callback(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CallbackRequest>,
) -> Result<(StatusCode, Json<DecisionResponse>), GatewayError> {
    let (decision, id) = notification::parse_callback(&payload.token)?;
    let status = match decision {
        CallbackDecision::Approve => {
            state.queue.approve(id)?;
            "approved"
        }
        CallbackDecision::Reject => {
            state.queue.reject(id)?;
            "rejected"
        }
    };

    Ok((
        StatusCode::OK,
        Json(DecisionResponse {
            id,
            status: status.to_string(),
        }),
    ))
}
