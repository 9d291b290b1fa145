//! Store-level transaction
//!
//! A [`LedgerTx`] is the only way to change a balance. Dropping it without
//! calling [`LedgerTx::commit`] rolls every statement back.
//!
//! SQLite takes its write lock on the first write of a transaction, so
//! services issue the balance update before anything else they read inside
//! the same transaction.

use super::models::{CreditCard, IdempotencyRecord, LedgerEntry, NewLedgerEntry, SlotSpin, FoodPurchase};
use crate::common::types::{CardId, MenuItemId, Tokens, UserId};
use crate::errors::{CasinoError, CasinoResult};
use chrono::Utc;
use sqlx::{Sqlite, Transaction};

pub struct LedgerTx {
    tx: Transaction<'static, Sqlite>,
}

impl LedgerTx {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    /// Subtract `amount` only if the balance covers it; returns the new balance
    ///
    /// The check and the update are a single statement, so two concurrent
    /// debits can never both pass against the same balance.
    pub async fn debit(&mut self, user_id: UserId, amount: Tokens) -> CasinoResult<Tokens> {
        if amount < 0 {
            return Err(CasinoError::validation("debit amount cannot be negative"));
        }

        let updated: Option<Tokens> = sqlx::query_scalar(
            "UPDATE users SET tokens = tokens - ?1 WHERE id = ?2 AND tokens >= ?1 RETURNING tokens",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match updated {
            Some(balance) => Ok(balance),
            None => {
                let available = self.balance(user_id).await?;
                Err(CasinoError::InsufficientFunds {
                    required: amount,
                    available,
                })
            }
        }
    }

    /// Add `amount` to the balance; returns the new balance
    pub async fn credit(&mut self, user_id: UserId, amount: Tokens) -> CasinoResult<Tokens> {
        if amount < 0 {
            return Err(CasinoError::validation("credit amount cannot be negative"));
        }

        let updated: Option<Tokens> = sqlx::query_scalar(
            "UPDATE users SET tokens = tokens + ?1 WHERE id = ?2 AND tokens <= ?3 RETURNING tokens",
        )
        .bind(amount)
        .bind(user_id)
        .bind(Tokens::MAX - amount)
        .fetch_optional(&mut *self.tx)
        .await?;

        match updated {
            Some(balance) => Ok(balance),
            None => {
                // Distinguish a missing user from a balance at the top of the range.
                self.balance(user_id).await?;
                Err(CasinoError::validation("Balance would exceed the token range"))
            }
        }
    }

    pub async fn balance(&mut self, user_id: UserId) -> CasinoResult<Tokens> {
        sqlx::query_scalar("SELECT tokens FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| CasinoError::not_found(format!("user {}", user_id)))
    }

    /// Owner of a card, `None` if the card does not exist
    pub async fn card_owner(&mut self, card_id: CardId) -> CasinoResult<Option<UserId>> {
        Ok(sqlx::query_scalar("SELECT user_id FROM credit_cards WHERE id = ?")
            .bind(card_id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    pub async fn append_transaction(&mut self, entry: NewLedgerEntry) -> CasinoResult<LedgerEntry> {
        Ok(sqlx::query_as::<_, LedgerEntry>(
            "INSERT INTO transactions (user_id, card_id, transaction_type, amount, description, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(entry.user_id)
        .bind(entry.card_id)
        .bind(entry.transaction_type)
        .bind(entry.amount)
        .bind(entry.description)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?)
    }

    pub async fn insert_card(&mut self, user_id: UserId, card_number: &str) -> CasinoResult<CreditCard> {
        Ok(sqlx::query_as::<_, CreditCard>(
            "INSERT INTO credit_cards (user_id, card_number, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(card_number)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?)
    }

    pub async fn insert_spin(
        &mut self,
        user_id: UserId,
        bet: Tokens,
        reels: &str,
        is_win: bool,
        payout: Tokens,
    ) -> CasinoResult<SlotSpin> {
        Ok(sqlx::query_as::<_, SlotSpin>(
            "INSERT INTO slots_spins (user_id, bet_amount, reels, is_win, payout_amount, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(bet)
        .bind(reels)
        .bind(is_win)
        .bind(payout)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?)
    }

    pub async fn insert_food_purchase(
        &mut self,
        user_id: UserId,
        food_item_id: MenuItemId,
        quantity: i64,
        total_price: Tokens,
    ) -> CasinoResult<FoodPurchase> {
        Ok(sqlx::query_as::<_, FoodPurchase>(
            "INSERT INTO food_purchases (user_id, food_item_id, quantity, total_price, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(food_item_id)
        .bind(quantity)
        .bind(total_price)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?)
    }

    /// Remember the outcome of a keyed request; a second insert for the
    /// same key fails with an integrity error
    pub async fn record_idempotency(&mut self, record: &IdempotencyRecord) -> CasinoResult<()> {
        sqlx::query(
            "INSERT INTO idempotency_keys \
             (idempotency_key, user_id, operation, request_hash, transaction_id, balance_after, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.idempotency_key)
        .bind(record.user_id)
        .bind(&record.operation)
        .bind(&record.request_hash)
        .bind(record.transaction_id)
        .bind(record.balance_after)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn commit(self) -> CasinoResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Explicit rollback; dropping the transaction has the same effect
    pub async fn rollback(self) -> CasinoResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::TransactionType;
    use crate::ledger::LedgerStore;

    #[tokio::test]
    async fn test_debit_refuses_overdraft() {
        let store = LedgerStore::in_memory().await.unwrap();
        let user = store.create_user("ada@example.com", "ada").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.debit(user.id, 101).await.unwrap_err();
        match err {
            CasinoError::InsufficientFunds { required, available } => {
                assert_eq!(required, 101);
                assert_eq!(available, 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(tx.debit(user.id, 100).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = LedgerStore::in_memory().await.unwrap();
        let user = store.create_user("ada@example.com", "ada").await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.credit(user.id, 40).await.unwrap();
            tx.append_transaction(NewLedgerEntry {
                user_id: user.id,
                card_id: None,
                transaction_type: TransactionType::PurchaseTokens,
                amount: 40,
                description: "Purchased 40 tokens".to_string(),
            })
            .await
            .unwrap();
        }

        assert_eq!(store.get_user(user.id).await.unwrap().tokens, 100);
        assert!(store.list_transactions(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_card_owner_lookup() {
        let store = LedgerStore::in_memory().await.unwrap();
        let user = store.create_user("ada@example.com", "ada").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let card = tx.insert_card(user.id, "4242424242424242").await.unwrap();
        assert_eq!(tx.card_owner(card.id).await.unwrap(), Some(user.id));
        assert_eq!(tx.card_owner(card.id + 1).await.unwrap(), None);
        tx.rollback().await.unwrap();

        assert!(store.list_cards(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected() {
        let store = LedgerStore::in_memory().await.unwrap();
        let user = store.create_user("ada@example.com", "ada").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(tx.debit(user.id, -1).await, Err(CasinoError::Validation(_))));
        assert!(matches!(tx.credit(user.id, -1).await, Err(CasinoError::Validation(_))));
    }
}
