//! Monitoring & Metrics
//!
//! Atomic counters for HTTP traffic and casino activity, exported in the
//! Prometheus text format.

use super::errors::ErrorCode;
use super::handlers::AppState;
use crate::services::{SpinResult, WalletReceipt};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::BTreeMap,
    fmt::Write as _,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};

/// Prometheus-compatible metrics registry
#[derive(Default)]
pub struct MetricsRegistry {
    /// HTTP request metrics
    pub http_requests_total: AtomicU64,
    pub http_requests_active: AtomicU64,
    pub http_request_duration_micros_total: AtomicU64,

    /// Casino activity
    pub logins_total: AtomicU64,
    pub registrations_total: AtomicU64,
    pub spins_total: AtomicU64,
    pub slot_wins_total: AtomicU64,
    pub tokens_wagered_total: AtomicU64,
    pub tokens_paid_out_total: AtomicU64,
    pub token_purchases_total: AtomicU64,
    pub tokens_purchased_total: AtomicU64,
    pub cash_outs_total: AtomicU64,
    pub tokens_cashed_out_total: AtomicU64,
    pub food_purchases_total: AtomicU64,
    pub food_tokens_spent_total: AtomicU64,

    /// Error metrics
    pub errors_total: AtomicU64,
    errors_by_code: Mutex<BTreeMap<&'static str, u64>>,
}

fn add(counter: &AtomicU64, amount: i64) {
    counter.fetch_add(u64::try_from(amount).unwrap_or(0), Ordering::Relaxed);
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_login(&self, created: bool) {
        if created {
            self.registrations_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.logins_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_spin(&self, bet: i64, result: &SpinResult) {
        self.spins_total.fetch_add(1, Ordering::Relaxed);
        add(&self.tokens_wagered_total, bet);
        if result.is_win {
            self.slot_wins_total.fetch_add(1, Ordering::Relaxed);
            add(&self.tokens_paid_out_total, result.payout);
        }
    }

    /// Replayed receipts were already counted the first time
    pub fn record_token_purchase(&self, receipt: &WalletReceipt) {
        if !receipt.replayed {
            self.token_purchases_total.fetch_add(1, Ordering::Relaxed);
            add(&self.tokens_purchased_total, receipt.tokens);
        }
    }

    pub fn record_cash_out(&self, receipt: &WalletReceipt) {
        if !receipt.replayed {
            self.cash_outs_total.fetch_add(1, Ordering::Relaxed);
            add(&self.tokens_cashed_out_total, receipt.tokens);
        }
    }

    pub fn record_food_purchase(&self, total_price: i64) {
        self.food_purchases_total.fetch_add(1, Ordering::Relaxed);
        add(&self.food_tokens_spent_total, total_price);
    }

    pub fn record_error(&self, code: &'static str) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
        let mut by_code = self.errors_by_code.lock().unwrap_or_else(|p| p.into_inner());
        *by_code.entry(code).or_default() += 1;
    }

    pub fn error_count(&self, code: &str) -> u64 {
        let by_code = self.errors_by_code.lock().unwrap_or_else(|p| p.into_inner());
        by_code.get(code).copied().unwrap_or(0)
    }

    /// Generate Prometheus metrics format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        let counters: [(&str, &str, &AtomicU64); 15] = [
            ("casino_http_requests_total", "Total number of HTTP requests", &self.http_requests_total),
            (
                "casino_http_request_duration_micros_total",
                "Cumulative HTTP handling time in microseconds",
                &self.http_request_duration_micros_total,
            ),
            ("casino_logins_total", "Logins of existing users", &self.logins_total),
            ("casino_registrations_total", "Newly registered users", &self.registrations_total),
            ("casino_spins_total", "Settled slot spins", &self.spins_total),
            ("casino_slot_wins_total", "Winning slot spins", &self.slot_wins_total),
            ("casino_tokens_wagered_total", "Tokens bet on slots", &self.tokens_wagered_total),
            ("casino_tokens_paid_out_total", "Tokens paid out by slots", &self.tokens_paid_out_total),
            ("casino_token_purchases_total", "Token purchases", &self.token_purchases_total),
            ("casino_tokens_purchased_total", "Tokens bought with cards", &self.tokens_purchased_total),
            ("casino_cash_outs_total", "Cash-outs", &self.cash_outs_total),
            ("casino_tokens_cashed_out_total", "Tokens converted to cash", &self.tokens_cashed_out_total),
            ("casino_food_purchases_total", "Food orders", &self.food_purchases_total),
            ("casino_food_tokens_spent_total", "Tokens spent on food", &self.food_tokens_spent_total),
            ("casino_errors_total", "Total number of failed requests", &self.errors_total),
        ];

        for (name, help, counter) in counters {
            let _ = write!(
                output,
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n\n",
                counter.load(Ordering::Relaxed)
            );
        }

        let _ = write!(
            output,
            "# HELP casino_http_requests_active Currently active HTTP requests\n\
             # TYPE casino_http_requests_active gauge\n\
             casino_http_requests_active {}\n\n",
            self.http_requests_active.load(Ordering::Relaxed)
        );

        let by_code = self.errors_by_code.lock().unwrap_or_else(|p| p.into_inner());
        if !by_code.is_empty() {
            output.push_str(
                "# HELP casino_errors_by_code_total Failed requests by error code\n\
                 # TYPE casino_errors_by_code_total counter\n",
            );
            for (code, count) in by_code.iter() {
                let _ = writeln!(output, "casino_errors_by_code_total{{code=\"{}\"}} {}", code, count);
            }
            output.push('\n');
        }

        output
    }
}

/// Counts requests, time spent and failures
pub async fn track_metrics(State(metrics): State<Arc<MetricsRegistry>>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    metrics.http_requests_total.fetch_add(1, Ordering::Relaxed);
    metrics.http_requests_active.fetch_add(1, Ordering::Relaxed);

    let response = next.run(request).await;

    metrics.http_requests_active.fetch_sub(1, Ordering::Relaxed);
    let micros = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
    metrics
        .http_request_duration_micros_total
        .fetch_add(micros, Ordering::Relaxed);

    if let Some(ErrorCode(code)) = response.extensions().get::<ErrorCode>().copied() {
        metrics.record_error(code);
    }

    response
}

/// Axum handler for Prometheus metrics endpoint
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.to_prometheus_format(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{Reels, Symbol};

    #[test]
    fn test_spin_counters() {
        let metrics = MetricsRegistry::new();
        let result = SpinResult {
            spin_id: 1,
            reels: Reels::new(Symbol::Lemon, Symbol::Lemon, Symbol::Lemon),
            is_win: true,
            payout: 30,
            net: 20,
            new_balance: 120,
        };
        metrics.record_spin(10, &result);

        assert_eq!(metrics.spins_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.slot_wins_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.tokens_wagered_total.load(Ordering::Relaxed), 10);
        assert_eq!(metrics.tokens_paid_out_total.load(Ordering::Relaxed), 30);
    }

    #[test]
    fn test_replayed_receipts_not_counted() {
        let metrics = MetricsRegistry::new();
        let mut receipt = WalletReceipt {
            transaction_id: 1,
            tokens: 50,
            new_balance: 50,
            cash_cents: Some(500),
            replayed: false,
        };
        metrics.record_cash_out(&receipt);
        receipt.replayed = true;
        metrics.record_cash_out(&receipt);

        assert_eq!(metrics.cash_outs_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.tokens_cashed_out_total.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = MetricsRegistry::new();
        metrics.record_error("NOT_FOUND");
        metrics.record_error("NOT_FOUND");
        metrics.record_food_purchase(16);

        let text = metrics.to_prometheus_format();
        assert!(text.contains("# TYPE casino_spins_total counter"));
        assert!(text.contains("casino_food_tokens_spent_total 16"));
        assert!(text.contains("casino_errors_by_code_total{code=\"NOT_FOUND\"} 2"));
        assert_eq!(metrics.error_count("NOT_FOUND"), 2);
    }
}
