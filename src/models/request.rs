use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An outbound transaction as described by the caller.
///
/// `to` is absent for contract creation. `value` is in native currency
/// units, `data` is a hex-encoded calldata string (with or without the
/// `0x` prefix).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub to: Option<String>,
    pub value: Decimal,
    #[serde(default)]
    pub data: Option<String>,
    pub operation: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl TransactionRequest {
    pub fn new(to: Option<String>, value: Decimal, data: Option<String>, operation: &str) -> Self {
        Self {
            to,
            value,
            data,
            operation: operation.to_string(),
            context: None,
            submitted_at: Utc::now(),
        }
    }
}
