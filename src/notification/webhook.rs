use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::notification::{ApprovalNotification, Notifier};

/// Posts approval requests to a configured operator webhook URL.
///
/// No URL configured means notifications are skipped entirely — items
/// are still resolvable through the operator API until they expire.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("txgate-notifier/1.0")
                .build()
                .expect("failed to build webhook HTTP client"),
            webhook_url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_approval_request(
        &self,
        payload: &ApprovalNotification,
    ) -> anyhow::Result<Option<String>> {
        let url = match &self.webhook_url {
            Some(u) => u,
            None => {
                debug!("no operator channel configured, skipping notification");
                return Ok(None);
            }
        };

        let delivery_id = uuid::Uuid::new_v4().to_string();
        let resp = self
            .client
            .post(url)
            .header("x-txgate-delivery-id", &delivery_id)
            .header("x-txgate-approval-id", payload.id.to_string())
            .json(payload)
            .send()
            .await
            .context("operator channel request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("operator channel returned error: status={status}, body={body}");
        }

        info!(
            id = %payload.id,
            delivery_id = %delivery_id,
            "approval request delivered to operator channel"
        );
        Ok(Some(delivery_id))
    }
}

// ── Tests ─────────────────────────────────────────────────────
