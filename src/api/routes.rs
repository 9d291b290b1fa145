//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::{handlers::*, monitoring::metrics_handler};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Accounts
        .route("/login", post(login_handler))
        .route("/me", get(profile_handler).delete(delete_account_handler))
        // Wallet
        .route("/cards", get(list_cards_handler).post(register_card_handler))
        .route("/cards/:id", delete(remove_card_handler))
        .route("/wallet", get(balance_handler))
        .route("/wallet/purchase", post(purchase_tokens_handler))
        .route("/wallet/cash-out", post(cash_out_handler))
        .route("/transactions", get(transactions_handler))
        // Slots
        .route("/slots/spin", post(spin_handler))
        .route("/slots/spins", get(spin_history_handler))
        .route("/slots/stats", get(slot_stats_handler))
        // Food station
        .route("/food/menu", get(menu_handler))
        .route("/food/purchase", post(food_purchase_handler))
        .route("/food/purchases", get(food_history_handler))
        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
