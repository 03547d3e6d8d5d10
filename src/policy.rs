//! Bounded-risk auto-approval policy.
//!
//! `evaluate` is a pure function over (request, daily spend, config) — no
//! clocks, no I/O, no env reads. All configuration arrives as an
//! explicitly-passed [`PolicyConfig`] value; the only place environment
//! variables are read is `config::load()`.

use rust_decimal::Decimal;

use crate::models::request::TransactionRequest;

// ── Policy Config ─────────────────────────────────────────────

/// Auto-approval policy knobs. Addresses and selectors are stored
/// normalized (lowercase, selectors without the `0x` prefix).
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Max native-currency value for a single auto-approved transaction.
    pub per_tx_ceiling: Decimal,
    /// Max cumulative auto-approved value per UTC calendar day.
    pub daily_ceiling: Decimal,
    /// Pre-approved destination addresses.
    pub whitelist: Vec<String>,
    /// 4-byte function selectors considered safe (8 lowercase hex chars).
    pub known_safe_selectors: Vec<String>,
    /// How long a queued item stays resolvable before the sweep expires it.
    pub expiry: chrono::Duration,
    /// Expiry sweep cadence in seconds.
    pub sweep_interval_secs: u64,
}

// ── Evaluation ────────────────────────────────────────────────

/// The leading 4-byte selector of a calldata string, if any.
#[derive(Debug, PartialEq)]
pub enum CalldataSelector {
    /// No calldata, or an empty `0x` payload — nothing to vet.
    Absent,
    /// Lowercase 8-hex-char selector.
    Selector(String),
    /// Present but not decodable as at least 4 bytes of hex.
    Malformed,
}

pub fn leading_selector(data: Option<&str>) -> CalldataSelector {
    let raw = match data {
        Some(d) => d.trim().trim_start_matches("0x"),
        None => return CalldataSelector::Absent,
    };
    if raw.is_empty() {
        return CalldataSelector::Absent;
    }
    match raw.get(..8) {
        Some(head) if hex::decode(head).is_ok() => {
            CalldataSelector::Selector(head.to_ascii_lowercase())
        }
        _ => CalldataSelector::Malformed,
    }
}

/// Decide whether `request` may be auto-approved.
///
/// Requires ALL of: value under the per-tx ceiling, daily spend plus
/// value under the daily ceiling, destination (when present) on the
/// whitelist, and the calldata selector (when present) in the safe set.
///
/// A missing destination (contract creation) trivially satisfies the
/// whitelist clause; whether that is the right product behavior is
/// still an open call, see DESIGN.md.
pub fn evaluate(request: &TransactionRequest, daily_spent: Decimal, config: &PolicyConfig) -> bool {
    if request.value > config.per_tx_ceiling {
        return false;
    }
    if daily_spent + request.value > config.daily_ceiling {
        return false;
    }
    if let Some(to) = &request.to {
        if !config.whitelist.iter().any(|w| w.eq_ignore_ascii_case(to)) {
            return false;
        }
    }
    match leading_selector(request.data.as_deref()) {
        CalldataSelector::Absent => true,
        CalldataSelector::Selector(sel) => config.known_safe_selectors.contains(&sel),
        CalldataSelector::Malformed => false,
    }
}

// ── Selector Decoding ─────────────────────────────────────────

/// Human-readable names for selectors we commonly see, used when
/// composing the operator notification. Unknown selectors are shown raw.
pub fn selector_name(selector: &str) -> Option<&'static str> {
    match selector {
        "a9059cbb" => Some("transfer(address,uint256)"),
        "095ea7b3" => Some("approve(address,uint256)"),
        "23b872dd" => Some("transferFrom(address,address,uint256)"),
        "7ff36ab5" => Some("swapExactETHForTokens(uint256,address[],address,uint256)"),
        "18cbafe5" => Some("swapExactTokensForETH(uint256,uint256,address[],address,uint256)"),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────
