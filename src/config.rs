use std::str::FromStr;

use anyhow::Context;
use rust_decimal::Decimal;

use crate::policy::PolicyConfig;

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    /// Path of the pending-approvals snapshot file.
    pub snapshot_path: String,
    /// Operator channel endpoint; `None` disables notifications.
    pub operator_webhook_url: Option<String>,
    pub policy: PolicyConfig,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let per_tx_ceiling = decimal_env("TXGATE_PER_TX_CEILING", "0.01")?;
    let daily_ceiling = decimal_env("TXGATE_DAILY_CEILING", "0.1")?;

    let whitelist: Vec<String> = list_env("TXGATE_WHITELIST")
        .into_iter()
        .map(|a| a.to_ascii_lowercase())
        .collect();

    let known_safe_selectors = list_env("TXGATE_SAFE_SELECTORS")
        .into_iter()
        .map(|s| normalize_selector(&s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let expiry_minutes: i64 = std::env::var("TXGATE_EXPIRY_MINUTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    let sweep_interval_secs: u64 = std::env::var("TXGATE_SWEEP_INTERVAL")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    Ok(Config {
        port: std::env::var("TXGATE_PORT")
            .unwrap_or_else(|_| "8443".into())
            .parse()
            .unwrap_or(8443),
        snapshot_path: std::env::var("TXGATE_SNAPSHOT_PATH")
            .unwrap_or_else(|_| "txgate-pending.json".into()),
        operator_webhook_url: std::env::var("TXGATE_OPERATOR_WEBHOOK_URL").ok(),
        policy: PolicyConfig {
            per_tx_ceiling,
            daily_ceiling,
            whitelist,
            known_safe_selectors,
            expiry: chrono::Duration::minutes(expiry_minutes),
            sweep_interval_secs,
        },
    })
}

fn decimal_env(key: &str, default: &str) -> anyhow::Result<Decimal> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.into());
    Decimal::from_str(raw.trim()).with_context(|| format!("{key} is not a decimal: {raw}"))
}

fn list_env(key: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Normalize a configured selector to 8 lowercase hex chars, no prefix.
fn normalize_selector(raw: &str) -> anyhow::Result<String> {
    let sel = raw.trim().trim_start_matches("0x").to_ascii_lowercase();
    if sel.len() != 8 || hex::decode(&sel).is_err() {
        anyhow::bail!("TXGATE_SAFE_SELECTORS entry is not a 4-byte hex selector: {raw}");
    }
    Ok(sel)
}

// ── Tests ─────────────────────────────────────────────────────
