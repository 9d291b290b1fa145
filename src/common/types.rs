//! Shared type definitions
//!
//! Identifiers, the ledger entry type, and the per-request context every
//! service call receives.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = i64;
pub type CardId = i64;
pub type MenuItemId = i64;
pub type TransactionId = i64;

/// In-app currency, always a whole number of tokens
pub type Tokens = i64;

/// Balance every account is created with (`users.tokens DEFAULT 100`)
pub const STARTING_BALANCE: Tokens = 100;

/// Ledger entry kind, stored as snake_case text in `transactions.transaction_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    PurchaseTokens,
    SlotWin,
    FoodPurchase,
    ConvertToCash,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::PurchaseTokens,
        TransactionType::SlotWin,
        TransactionType::FoodPurchase,
        TransactionType::ConvertToCash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::PurchaseTokens => "purchase_tokens",
            TransactionType::SlotWin => "slot_win",
            TransactionType::FoodPurchase => "food_purchase",
            TransactionType::ConvertToCash => "convert_to_cash",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown transaction type '{}'", s))
    }
}

/// Explicit per-request context: who is calling, and how to correlate the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: UserId,
    pub request_id: String,
    /// Client-supplied key; replays with the same key return the first result
    pub idempotency_key: Option<String>,
}

impl RequestContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            request_id: Uuid::new_v4().to_string(),
            idempotency_key: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Hash of an operation's parameters, used to detect an idempotency key
/// reused for a different request
pub fn request_fingerprint(operation: &str, user_id: UserId, params: &[i64]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(user_id.to_be_bytes());
    for param in params {
        hasher.update(param.to_be_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_round_trip_names() {
        for kind in TransactionType::ALL {
            assert_eq!(kind.as_str().parse::<TransactionType>().unwrap(), kind);
        }
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_transaction_type_serde_matches_schema() {
        let json = serde_json::to_string(&TransactionType::ConvertToCash).unwrap();
        assert_eq!(json, "\"convert_to_cash\"");
    }

    #[test]
    fn test_request_context_builder() {
        let ctx = RequestContext::new(7)
            .with_request_id("req-1")
            .with_idempotency_key("key-1");

        assert_eq!(ctx.user_id, 7);
        assert_eq!(ctx.request_id, "req-1");
        assert_eq!(ctx.idempotency_key.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_fingerprint_depends_on_params() {
        let a = request_fingerprint("cash_out", 1, &[50]);
        let b = request_fingerprint("cash_out", 1, &[50]);
        let c = request_fingerprint("cash_out", 1, &[60]);
        let d = request_fingerprint("purchase_tokens", 1, &[50]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64);
    }
}
