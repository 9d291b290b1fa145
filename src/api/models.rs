//! API Request and Response Models

use crate::common::types::{CardId, MenuItemId, Tokens, UserId};
use crate::game_store::SlotStats;
use crate::ledger::{CreditCard, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: User,
    /// True when this call created the account
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCardRequest {
    pub card_number: String,
}

/// Card as shown to the owner; the full number never leaves the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardView {
    pub id: CardId,
    pub masked_number: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CreditCard> for CardView {
    fn from(card: &CreditCard) -> Self {
        Self {
            id: card.id,
            masked_number: card.masked(),
            created_at: card.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: UserId,
    pub tokens: Tokens,
    pub tokens_per_usd: Tokens,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseTokensRequest {
    pub card_id: CardId,
    pub usd_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashOutRequest {
    pub tokens: Tokens,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinRequest {
    pub bet: Tokens,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotStatsResponse {
    #[serde(flatten)]
    pub stats: SlotStats,
    pub return_to_player: f64,
}

impl From<SlotStats> for SlotStatsResponse {
    fn from(stats: SlotStats) -> Self {
        Self {
            return_to_player: stats.return_to_player(),
            stats,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodPurchaseRequest {
    pub item_id: MenuItemId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}
