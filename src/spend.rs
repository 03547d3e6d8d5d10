//! Daily auto-approve spend accounting.
//!
//! The policy check and the counter increment happen under one lock so
//! concurrent submits cannot jointly exceed the daily ceiling.

use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::models::request::TransactionRequest;
use crate::policy::{self, PolicyConfig};

/// Cumulative auto-approved value for the current UTC calendar day.
///
/// The window rolls over lazily on first use after midnight; the total
/// only ever increases via the auto-approve path.
pub struct DailySpendCounter {
    window: Mutex<SpendWindow>,
}

struct SpendWindow {
    day: NaiveDate,
    total: Decimal,
}

impl DailySpendCounter {
    pub fn new() -> Self {
        Self {
            window: Mutex::new(SpendWindow {
                day: Utc::now().date_naive(),
                total: Decimal::ZERO,
            }),
        }
    }

    /// Evaluate the policy against today's running total and, if it
    /// passes, reserve the request's value — atomically.
    pub fn evaluate_and_reserve(&self, request: &TransactionRequest, config: &PolicyConfig) -> bool {
        self.evaluate_and_reserve_on(Utc::now().date_naive(), request, config)
    }

    fn evaluate_and_reserve_on(
        &self,
        today: NaiveDate,
        request: &TransactionRequest,
        config: &PolicyConfig,
    ) -> bool {
        let mut w = self.window.lock().expect("spend window lock poisoned");
        if w.day != today {
            tracing::debug!(day = %today, "daily spend window rolled over");
            w.day = today;
            w.total = Decimal::ZERO;
        }
        if !policy::evaluate(request, w.total, config) {
            return false;
        }
        w.total += request.value;
        true
    }

    /// Today's cumulative auto-approved value.
    pub fn spent_today(&self) -> Decimal {
        let w = self.window.lock().expect("spend window lock poisoned");
        if w.day == Utc::now().date_naive() {
            w.total
        } else {
            Decimal::ZERO
        }
    }
}

impl Default for DailySpendCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────
