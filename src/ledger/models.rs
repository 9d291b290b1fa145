//! Row types for the ledger tables

use crate::common::types::{CardId, MenuItemId, Tokens, TransactionId, TransactionType, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub tokens: Tokens,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CreditCard {
    pub id: CardId,
    pub user_id: UserId,
    pub card_number: String,
    pub created_at: DateTime<Utc>,
}

impl CreditCard {
    pub fn last_four(&self) -> &str {
        let len = self.card_number.len();
        if len <= 4 || !self.card_number.is_char_boundary(len - 4) {
            &self.card_number
        } else {
            &self.card_number[len - 4..]
        }
    }

    /// Display form, e.g. `**** **** **** 4242`
    pub fn masked(&self) -> String {
        format!("**** **** **** {}", self.last_four())
    }
}

/// One row of `transactions`: an immutable signed token movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: TransactionId,
    pub user_id: UserId,
    pub card_id: Option<CardId>,
    pub transaction_type: TransactionType,
    pub amount: Tokens,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry about to be appended
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: UserId,
    pub card_id: Option<CardId>,
    pub transaction_type: TransactionType,
    pub amount: Tokens,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SlotSpin {
    pub id: i64,
    pub user_id: UserId,
    pub bet_amount: Tokens,
    /// Reel symbols joined with `-`
    pub reels: String,
    pub is_win: bool,
    pub payout_amount: Tokens,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FoodMenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub description: Option<String>,
    pub price: Tokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FoodPurchase {
    pub id: i64,
    pub user_id: UserId,
    pub food_item_id: MenuItemId,
    pub quantity: i64,
    pub total_price: Tokens,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a completed wallet operation, keyed by the client's idempotency key
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct IdempotencyRecord {
    pub idempotency_key: String,
    pub user_id: UserId,
    pub operation: String,
    pub request_hash: String,
    pub transaction_id: TransactionId,
    pub balance_after: Tokens,
}

/// Stored balance next to the sum of the user's ledger amounts
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BalanceRow {
    pub user_id: UserId,
    pub tokens: Tokens,
    pub ledger_total: Tokens,
}
