//! End-to-end gateway scenarios: policy admission, manual resolution,
//! expiry, restart recovery, and the operator HTTP API.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use tower::ServiceExt;

use txgate::api::{self, AppState};
use txgate::errors::GatewayError;
use txgate::models::request::TransactionRequest;
use txgate::notification::webhook::WebhookNotifier;
use txgate::policy::PolicyConfig;
use txgate::queue::{ApprovalQueue, SubmitOutcome};
use txgate::store::snapshot::SnapshotStore;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn policy(expiry: chrono::Duration) -> PolicyConfig {
    PolicyConfig {
        per_tx_ceiling: dec("0.001"),
        daily_ceiling: dec("0.01"),
        whitelist: vec!["0xabc".to_string()],
        known_safe_selectors: vec!["a9059cbb".to_string()],
        expiry,
        sweep_interval_secs: 60,
    }
}

fn gateway(expiry: chrono::Duration, dir: &tempfile::TempDir) -> Arc<ApprovalQueue> {
    Arc::new(ApprovalQueue::new(
        policy(expiry),
        Arc::new(WebhookNotifier::new(None)),
        Arc::new(SnapshotStore::new(dir.path().join("pending.json"))),
    ))
}

fn req(to: Option<&str>, value: &str, data: Option<&str>) -> TransactionRequest {
    TransactionRequest::new(to.map(String::from), dec(value), data.map(String::from), "test-op")
}

async fn wait_for_pending(queue: &ApprovalQueue, n: usize) {
    for _ in 0..200 {
        if queue.pending_len() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("queue never reached {n} pending item(s)");
}

// ── Policy admission scenarios ────────────────────────────────

#[tokio::test]
async fn whitelisted_transfer_under_ceilings_auto_approves() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    let outcome = queue
        .submit(req(Some("0xABC"), "0.0005", Some("0xa9059cbb000000")))
        .await
        .unwrap();
    assert_eq!(outcome, SubmitOutcome::AutoApproved);
    assert_eq!(queue.spent_today(), dec("0.0005"));
}

#[tokio::test]
async fn value_breaching_daily_budget_is_queued() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    queue
        .submit(req(Some("0xabc"), "0.0005", None))
        .await
        .unwrap();

    let q = queue.clone();
    let pending = tokio::spawn(async move { q.submit(req(Some("0xabc"), "0.0096", None)).await });
    wait_for_pending(&queue, 1).await;

    // queued, not auto-approved: the counter did not move
    assert_eq!(queue.spent_today(), dec("0.0005"));

    let id = queue.list_pending()[0].id;
    queue.reject(id).unwrap();
    assert!(matches!(pending.await.unwrap(), Err(GatewayError::ManualRejected)));
}

#[tokio::test]
async fn non_whitelisted_destination_is_queued_despite_small_value() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    let q = queue.clone();
    let pending = tokio::spawn(async move { q.submit(req(Some("0xDEF"), "0.0001", None)).await });
    wait_for_pending(&queue, 1).await;
    assert_eq!(queue.spent_today(), Decimal::ZERO);

    let id = queue.list_pending()[0].id;
    queue.approve(id).unwrap();
    assert_eq!(pending.await.unwrap().unwrap(), SubmitOutcome::ManuallyApproved);
}

// ── Expiry ────────────────────────────────────────────────────

#[tokio::test]
async fn unresolved_item_expires_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::zero(), &dir);

    let q = queue.clone();
    let pending = tokio::spawn(async move { q.submit(req(Some("0xdef"), "0.0001", None)).await });
    wait_for_pending(&queue, 1).await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(queue.sweep_expired(), 1);
    assert!(matches!(pending.await.unwrap(), Err(GatewayError::Expired)));

    // the item is gone: repeat sweeps and late decisions find nothing
    assert_eq!(queue.sweep_expired(), 0);
}

// ── Idempotent resolution ─────────────────────────────────────

#[tokio::test]
async fn second_decision_gets_already_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    let q = queue.clone();
    let pending = tokio::spawn(async move { q.submit(req(Some("0xdef"), "0.0001", None)).await });
    wait_for_pending(&queue, 1).await;
    let id = queue.list_pending()[0].id;

    queue.approve(id).unwrap();
    assert!(matches!(queue.approve(id), Err(GatewayError::AlreadyResolved)));
    assert!(matches!(queue.reject(id), Err(GatewayError::AlreadyResolved)));
    assert_eq!(pending.await.unwrap().unwrap(), SubmitOutcome::ManuallyApproved);
}

#[tokio::test]
async fn concurrent_approvals_have_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    let q = queue.clone();
    let pending = tokio::spawn(async move { q.submit(req(Some("0xdef"), "0.0001", None)).await });
    wait_for_pending(&queue, 1).await;
    let id = queue.list_pending()[0].id;

    let q1 = queue.clone();
    let q2 = queue.clone();
    let (a, b) = tokio::join!(
        tokio::task::spawn_blocking(move || q1.approve(id)),
        tokio::task::spawn_blocking(move || q2.approve(id)),
    );
    let results = [a.unwrap(), b.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(GatewayError::AlreadyResolved)))
            .count(),
        1
    );
    assert_eq!(pending.await.unwrap().unwrap(), SubmitOutcome::ManuallyApproved);
}

// ── Crash recovery ────────────────────────────────────────────

#[tokio::test]
async fn restart_discards_pending_items() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("pending.json");
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    let q = queue.clone();
    let _pending = tokio::spawn(async move { q.submit(req(Some("0xdef"), "0.0001", None)).await });
    wait_for_pending(&queue, 1).await;

    // the enqueue snapshot write is async; wait for it to land
    let mut persisted = false;
    for _ in 0..200 {
        if let Ok(bytes) = tokio::fs::read(&snapshot_path).await {
            if serde_json::from_slice::<Vec<serde_json::Value>>(&bytes)
                .map(|v| v.len() == 1)
                .unwrap_or(false)
            {
                persisted = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(persisted, "enqueue never persisted a snapshot");

    // "restart": a fresh store over the same file discards everything
    let store = SnapshotStore::new(&snapshot_path);
    assert_eq!(store.recover().await.unwrap(), 1);

    let fresh = ApprovalQueue::new(
        policy(chrono::Duration::minutes(10)),
        Arc::new(WebhookNotifier::new(None)),
        Arc::new(store),
    );
    assert_eq!(fresh.pending_len(), 0);
    assert!(fresh.list_pending().is_empty());
}

// ── Operator HTTP API ─────────────────────────────────────────

fn router(queue: Arc<ApprovalQueue>) -> axum::Router {
    api::router(Arc::new(AppState { queue }))
}

#[tokio::test]
async fn api_submit_auto_approves() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);
    let app = router(queue);

    let body = serde_json::json!({
        "to": "0xabc",
        "value": "0.0005",
        "data": "0xa9059cbb00",
        "operation": "transfer",
    });
    let resp = app
        .oneshot(
            Request::post("/api/v1/transactions")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "approved");
    assert_eq!(json["mode"], "auto");
}

#[tokio::test]
async fn api_decision_resolves_suspended_submit() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    let q = queue.clone();
    let pending = tokio::spawn(async move { q.submit(req(Some("0xdef"), "0.0001", None)).await });
    wait_for_pending(&queue, 1).await;
    let id = queue.list_pending()[0].id;

    // listing shows the queued item
    let resp = router(queue.clone())
        .oneshot(Request::get("/api/v1/approvals").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], id.to_string());

    // approve through the decision endpoint
    let resp = router(queue.clone())
        .oneshot(
            Request::post(format!("/api/v1/approvals/{id}/decision"))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"decision":"approve"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(pending.await.unwrap().unwrap(), SubmitOutcome::ManuallyApproved);

    // a second decision conflicts
    let resp = router(queue)
        .oneshot(
            Request::post(format!("/api/v1/approvals/{id}/decision"))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"decision":"reject"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn api_callback_token_routes_to_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    let q = queue.clone();
    let pending = tokio::spawn(async move { q.submit(req(Some("0xdef"), "0.0001", None)).await });
    wait_for_pending(&queue, 1).await;
    let id = queue.list_pending()[0].id;

    let body = serde_json::json!({ "token": format!("reject:{id}") });
    let resp = router(queue)
        .oneshot(
            Request::post("/api/v1/callbacks")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(matches!(pending.await.unwrap(), Err(GatewayError::ManualRejected)));
}

#[tokio::test]
async fn api_malformed_callback_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let queue = gateway(chrono::Duration::minutes(10), &dir);

    let resp = router(queue)
        .oneshot(
            Request::post("/api/v1/callbacks")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"token":"launch:the-missiles"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
