//! Token wallet: cards, purchases and cash-outs
//!
//! Every balance change runs inside one [`LedgerTx`](crate::ledger::LedgerTx)
//! together with the ledger row that explains it. Purchases and cash-outs
//! accept an idempotency key; a replay returns the first receipt unchanged.

use crate::common::types::{
    request_fingerprint, CardId, RequestContext, Tokens, TransactionType,
};
use crate::config::WalletConfig;
use crate::errors::{CasinoError, CasinoResult};
use crate::ledger::{CreditCard, IdempotencyRecord, LedgerEntry, LedgerStore, NewLedgerEntry};
use serde::Serialize;
use tracing::{debug, info, warn};

const OP_PURCHASE_TOKENS: &str = "purchase_tokens";
const OP_CASH_OUT: &str = "cash_out";

/// Result of a purchase or cash-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletReceipt {
    pub transaction_id: i64,
    /// Tokens moved, always positive
    pub tokens: Tokens,
    pub new_balance: Tokens,
    /// Cash paid out, in US cents; only set for cash-outs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_cents: Option<i64>,
    /// True when the receipt was served from an earlier call with the same key
    pub replayed: bool,
}

#[derive(Clone)]
pub struct WalletService {
    store: LedgerStore,
    config: WalletConfig,
}

impl WalletService {
    pub fn new(store: LedgerStore, config: WalletConfig) -> Self {
        Self { store, config }
    }

    pub fn tokens_per_usd(&self) -> Tokens {
        self.config.tokens_per_usd
    }

    pub async fn balance(&self, ctx: &RequestContext) -> CasinoResult<Tokens> {
        Ok(self.store.get_user(ctx.user_id).await?.tokens)
    }

    /// The caller's ledger, oldest first
    pub async fn transactions(&self, ctx: &RequestContext) -> CasinoResult<Vec<LedgerEntry>> {
        self.store.list_transactions(ctx.user_id).await
    }

    // ---------------------------------------------------------------------
    // Cards
    // ---------------------------------------------------------------------

    pub async fn register_card(&self, ctx: &RequestContext, card_number: &str) -> CasinoResult<CreditCard> {
        let card_number = card_number.trim();
        if card_number.is_empty() {
            return Err(CasinoError::validation("Card number is required"));
        }
        if self.config.strict_card_numbers
            && !(card_number.len() == 16 && card_number.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(CasinoError::validation("Please enter a valid 16-digit card number"));
        }

        // Surface an unknown caller as NotFound rather than a foreign key failure.
        self.store.get_user(ctx.user_id).await?;

        let mut tx = self.store.begin().await?;
        let card = tx.insert_card(ctx.user_id, card_number).await?;
        tx.commit().await?;

        info!(user_id = ctx.user_id, card_id = card.id, "Card registered");
        Ok(card)
    }

    pub async fn list_cards(&self, ctx: &RequestContext) -> CasinoResult<Vec<CreditCard>> {
        self.store.list_cards(ctx.user_id).await
    }

    pub async fn remove_card(&self, ctx: &RequestContext, card_id: CardId) -> CasinoResult<()> {
        self.store.delete_card(ctx.user_id, card_id).await?;
        info!(user_id = ctx.user_id, card_id, "Card removed");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Balance-changing operations
    // ---------------------------------------------------------------------

    /// Buy tokens with a registered card at the fixed conversion rate
    pub async fn purchase_tokens(
        &self,
        ctx: &RequestContext,
        card_id: CardId,
        usd_amount: i64,
    ) -> CasinoResult<WalletReceipt> {
        if usd_amount <= 0 {
            return Err(CasinoError::validation("Purchase amount must be greater than 0"));
        }
        let tokens = usd_amount
            .checked_mul(self.config.tokens_per_usd)
            .ok_or_else(|| CasinoError::validation("Purchase amount is too large"))?;

        let fingerprint = request_fingerprint(OP_PURCHASE_TOKENS, ctx.user_id, &[card_id, usd_amount]);
        if let Some(receipt) = self.replay(ctx, OP_PURCHASE_TOKENS, &fingerprint).await? {
            return Ok(receipt);
        }

        match self.apply_purchase(ctx, card_id, tokens, &fingerprint).await {
            Ok(receipt) => {
                info!(
                    user_id = ctx.user_id,
                    request_id = %ctx.request_id,
                    usd_amount,
                    amount = tokens,
                    new_balance = receipt.new_balance,
                    "Tokens purchased"
                );
                Ok(receipt)
            }
            Err(e) => self.replay_after_conflict(ctx, OP_PURCHASE_TOKENS, &fingerprint, e).await,
        }
    }

    async fn apply_purchase(
        &self,
        ctx: &RequestContext,
        card_id: CardId,
        tokens: Tokens,
        fingerprint: &str,
    ) -> CasinoResult<WalletReceipt> {
        let mut tx = self.store.begin().await?;
        let new_balance = tx.credit(ctx.user_id, tokens).await?;

        match tx.card_owner(card_id).await? {
            None => return Err(CasinoError::not_found(format!("card {}", card_id))),
            Some(owner) if owner != ctx.user_id => {
                warn!(user_id = ctx.user_id, card_id, "Purchase with another user's card refused");
                return Err(CasinoError::validation("Card does not belong to this account"));
            }
            Some(_) => {}
        }

        let entry = tx
            .append_transaction(NewLedgerEntry {
                user_id: ctx.user_id,
                card_id: Some(card_id),
                transaction_type: TransactionType::PurchaseTokens,
                amount: tokens,
                description: format!("Purchased {} tokens.", tokens),
            })
            .await?;

        if let Some(key) = &ctx.idempotency_key {
            tx.record_idempotency(&IdempotencyRecord {
                idempotency_key: key.clone(),
                user_id: ctx.user_id,
                operation: OP_PURCHASE_TOKENS.to_string(),
                request_hash: fingerprint.to_string(),
                transaction_id: entry.id,
                balance_after: new_balance,
            })
            .await?;
        }
        tx.commit().await?;

        Ok(WalletReceipt {
            transaction_id: entry.id,
            tokens,
            new_balance,
            cash_cents: None,
            replayed: false,
        })
    }

    /// Convert tokens back to cash at the fixed rate
    pub async fn cash_out(&self, ctx: &RequestContext, tokens: Tokens) -> CasinoResult<WalletReceipt> {
        if tokens <= 0 {
            return Err(CasinoError::validation("Cash-out amount must be greater than 0"));
        }

        let fingerprint = request_fingerprint(OP_CASH_OUT, ctx.user_id, &[tokens]);
        if let Some(receipt) = self.replay(ctx, OP_CASH_OUT, &fingerprint).await? {
            return Ok(receipt);
        }

        match self.apply_cash_out(ctx, tokens, &fingerprint).await {
            Ok(receipt) => {
                info!(
                    user_id = ctx.user_id,
                    request_id = %ctx.request_id,
                    amount = tokens,
                    cash_cents = ?receipt.cash_cents,
                    new_balance = receipt.new_balance,
                    "Tokens cashed out"
                );
                Ok(receipt)
            }
            Err(e) => {
                debug!(user_id = ctx.user_id, amount = tokens, error = %e, "Cash-out refused");
                self.replay_after_conflict(ctx, OP_CASH_OUT, &fingerprint, e).await
            }
        }
    }

    async fn apply_cash_out(
        &self,
        ctx: &RequestContext,
        tokens: Tokens,
        fingerprint: &str,
    ) -> CasinoResult<WalletReceipt> {
        let mut tx = self.store.begin().await?;
        let new_balance = tx.debit(ctx.user_id, tokens).await?;

        let cash_cents = tokens_to_cents(tokens, self.config.tokens_per_usd);
        let entry = tx
            .append_transaction(NewLedgerEntry {
                user_id: ctx.user_id,
                card_id: None,
                transaction_type: TransactionType::ConvertToCash,
                amount: -tokens,
                description: format!("Converted {} tokens to ${}.{:02}.", tokens, cash_cents / 100, cash_cents % 100),
            })
            .await?;

        if let Some(key) = &ctx.idempotency_key {
            tx.record_idempotency(&IdempotencyRecord {
                idempotency_key: key.clone(),
                user_id: ctx.user_id,
                operation: OP_CASH_OUT.to_string(),
                request_hash: fingerprint.to_string(),
                transaction_id: entry.id,
                balance_after: new_balance,
            })
            .await?;
        }
        tx.commit().await?;

        Ok(WalletReceipt {
            transaction_id: entry.id,
            tokens,
            new_balance,
            cash_cents: Some(cash_cents),
            replayed: false,
        })
    }

    /// A keyed call that lost a race to a concurrent call with the same key
    /// fails on the key's unique index, or on the balance the winner already
    /// spent. Serve the winner's receipt when one was committed.
    async fn replay_after_conflict(
        &self,
        ctx: &RequestContext,
        operation: &str,
        fingerprint: &str,
        error: CasinoError,
    ) -> CasinoResult<WalletReceipt> {
        if ctx.idempotency_key.is_none()
            || !matches!(error, CasinoError::Integrity(_) | CasinoError::InsufficientFunds { .. })
        {
            return Err(error);
        }
        match self.replay(ctx, operation, fingerprint).await? {
            Some(receipt) => Ok(receipt),
            None => Err(error),
        }
    }

    /// Look up an earlier result for the context's idempotency key
    async fn replay(
        &self,
        ctx: &RequestContext,
        operation: &str,
        fingerprint: &str,
    ) -> CasinoResult<Option<WalletReceipt>> {
        let Some(key) = ctx.idempotency_key.as_deref() else {
            return Ok(None);
        };
        let Some(record) = self.store.find_idempotency(key).await? else {
            return Ok(None);
        };

        if record.user_id != ctx.user_id || record.operation != operation || record.request_hash != fingerprint {
            warn!(user_id = ctx.user_id, operation, "Idempotency key reused for a different request");
            return Err(CasinoError::validation(format!(
                "Idempotency key '{}' was already used for a different request",
                key
            )));
        }

        let entry = self.store.get_transaction(record.transaction_id).await?;
        let tokens = entry.amount.abs();
        let cash_cents = (entry.transaction_type == TransactionType::ConvertToCash)
            .then(|| tokens_to_cents(tokens, self.config.tokens_per_usd));

        debug!(user_id = ctx.user_id, transaction_id = entry.id, operation, "Replaying wallet operation");
        Ok(Some(WalletReceipt {
            transaction_id: entry.id,
            tokens,
            new_balance: record.balance_after,
            cash_cents,
            replayed: true,
        }))
    }
}

/// Cash value of `tokens` in cents, rounded down
pub fn tokens_to_cents(tokens: Tokens, tokens_per_usd: Tokens) -> i64 {
    let cents = i128::from(tokens) * 100 / i128::from(tokens_per_usd.max(1));
    i64::try_from(cents).unwrap_or(i64::MAX)
}
