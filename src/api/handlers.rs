//! Request Handlers
//!
//! Thin adapters from HTTP to the service layer. Every handler that acts for
//! a user takes a [`RequestContext`] built from the request headers.

use super::{
    errors::ApiError,
    middleware::{ApiJson, ApiPath, ApiQuery, RequestId},
    models::*,
    monitoring::MetricsRegistry,
};
use crate::{
    common::types::{CardId, RequestContext},
    ledger::{FoodMenuItem, LedgerEntry, SlotSpin, User},
    services::{CasinoServices, FoodReceipt, SpinResult, WalletReceipt},
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub services: CasinoServices,
    pub metrics: Arc<MetricsRegistry>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /login
pub async fn login_handler(
    RequestId(request_id): RequestId,
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let (user, created) = state
        .services
        .accounts
        .login_or_register(&body.email, &body.username)
        .await
        .map_err(|e| ApiError::new(request_id, e))?;

    state.metrics.record_login(created);
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(LoginResponse { user, created })))
}

/// GET /me
pub async fn profile_handler(ctx: RequestContext, State(state): State<Arc<AppState>>) -> ApiResult<User> {
    let user = state
        .services
        .accounts
        .profile(&ctx)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;
    Ok(Json(user))
}

/// DELETE /me
pub async fn delete_account_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .accounts
        .delete_account(&ctx)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /cards
pub async fn list_cards_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<CardView>> {
    let cards = state
        .services
        .wallet
        .list_cards(&ctx)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;
    Ok(Json(cards.iter().map(CardView::from).collect()))
}

/// POST /cards
pub async fn register_card_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterCardRequest>,
) -> Result<(StatusCode, Json<CardView>), ApiError> {
    let card = state
        .services
        .wallet
        .register_card(&ctx, &body.card_number)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;
    Ok((StatusCode::CREATED, Json(CardView::from(&card))))
}

/// DELETE /cards/:id
pub async fn remove_card_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiPath(card_id): ApiPath<CardId>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .wallet
        .remove_card(&ctx, card_id)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /wallet
pub async fn balance_handler(ctx: RequestContext, State(state): State<Arc<AppState>>) -> ApiResult<BalanceResponse> {
    let wallet = &state.services.wallet;
    let tokens = wallet
        .balance(&ctx)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;

    Ok(Json(BalanceResponse {
        user_id: ctx.user_id,
        tokens,
        tokens_per_usd: wallet.tokens_per_usd(),
    }))
}

/// POST /wallet/purchase
pub async fn purchase_tokens_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<PurchaseTokensRequest>,
) -> ApiResult<WalletReceipt> {
    let receipt = state
        .services
        .wallet
        .purchase_tokens(&ctx, body.card_id, body.usd_amount)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;

    state.metrics.record_token_purchase(&receipt);
    Ok(Json(receipt))
}

/// POST /wallet/cash-out
pub async fn cash_out_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CashOutRequest>,
) -> ApiResult<WalletReceipt> {
    let receipt = state
        .services
        .wallet
        .cash_out(&ctx, body.tokens)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;

    state.metrics.record_cash_out(&receipt);
    Ok(Json(receipt))
}

/// GET /transactions
pub async fn transactions_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<LedgerEntry>> {
    let entries = state
        .services
        .wallet
        .transactions(&ctx)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;
    Ok(Json(entries))
}

/// POST /slots/spin
pub async fn spin_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SpinRequest>,
) -> ApiResult<SpinResult> {
    let result = state
        .services
        .slots
        .spin(&ctx, body.bet)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;

    state.metrics.record_spin(body.bet, &result);
    Ok(Json(result))
}

/// GET /slots/spins?limit={n}
pub async fn spin_history_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Vec<SlotSpin>> {
    let spins = state
        .services
        .slots
        .history(&ctx, query.limit)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;
    Ok(Json(spins))
}

/// GET /slots/stats
pub async fn slot_stats_handler(
    RequestId(request_id): RequestId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SlotStatsResponse> {
    let stats = state
        .services
        .slots
        .stats()
        .await
        .map_err(|e| ApiError::new(request_id, e))?;
    Ok(Json(stats.into()))
}

/// GET /food/menu
pub async fn menu_handler(
    RequestId(request_id): RequestId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<FoodMenuItem>> {
    let menu = state
        .services
        .food
        .menu()
        .await
        .map_err(|e| ApiError::new(request_id, e))?;
    Ok(Json(menu))
}

/// POST /food/purchase
pub async fn food_purchase_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<FoodPurchaseRequest>,
) -> ApiResult<FoodReceipt> {
    let receipt = state
        .services
        .food
        .checkout(&ctx, body.item_id, body.quantity)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;

    state.metrics.record_food_purchase(receipt.purchase.total_price);
    Ok(Json(receipt))
}

/// GET /food/purchases
pub async fn food_history_handler(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<crate::ledger::FoodPurchase>> {
    let purchases = state
        .services
        .food
        .history(&ctx)
        .await
        .map_err(|e| ApiError::new(&ctx.request_id, e))?;
    Ok(Json(purchases))
}
