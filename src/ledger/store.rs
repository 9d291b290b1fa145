//! Ledger storage over SQLite
//!
//! Reads run directly on the pool. Anything that moves tokens goes through
//! [`LedgerStore::begin`], which hands out a [`LedgerTx`] so the balance
//! update and its log rows commit or roll back together.

use super::models::{
    BalanceRow, CreditCard, FoodMenuItem, FoodPurchase, IdempotencyRecord, LedgerEntry, User,
};
use super::tx::LedgerTx;
use crate::common::types::{CardId, MenuItemId, TransactionId, UserId};
use crate::config::DatabaseConfig;
use crate::errors::{CasinoError, CasinoResult};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

#[derive(Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
}

impl LedgerStore {
    /// Open (and migrate) the database described by `config`
    pub async fn open(config: &DatabaseConfig) -> CasinoResult<Self> {
        let pool = Self::connect(config, false).await?;
        Self::from_pool(pool).await
    }

    /// Open an existing database for inspection. No migrations run and
    /// every write fails.
    pub async fn open_read_only(config: &DatabaseConfig) -> CasinoResult<Self> {
        let pool = Self::connect(config, true).await?;
        Ok(Self { pool })
    }

    async fn connect(config: &DatabaseConfig, read_only: bool) -> CasinoResult<SqlitePool> {
        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(config.create_if_missing && !read_only)
            .read_only(read_only)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout());

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);

        if config.is_in_memory() {
            // The database lives only as long as its connection.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else if !read_only {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = pool_options.connect_with(options).await?;
        info!(url = %config.url, max_connections = config.max_connections, read_only, "Ledger database opened");
        Ok(pool)
    }

    /// Private in-memory ledger with the schema and seed menu applied
    pub async fn in_memory() -> CasinoResult<Self> {
        Self::open(&crate::config::CasinoConfig::in_memory().database).await
    }

    /// Wrap an existing pool, applying pending migrations
    pub async fn from_pool(pool: SqlitePool) -> CasinoResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a store-level transaction
    pub async fn begin(&self) -> CasinoResult<LedgerTx> {
        Ok(LedgerTx::new(self.pool.begin().await?))
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    pub async fn get_user(&self, user_id: UserId) -> CasinoResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CasinoError::not_found(format!("user {}", user_id)))
    }

    pub async fn find_user_by_email(&self, email: &str) -> CasinoResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_user_by_login(&self, email: &str, username: &str) -> CasinoResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? AND username = ?")
                .bind(email)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Insert a user with the schema's default balance
    pub async fn create_user(&self, email: &str, username: &str) -> CasinoResult<User> {
        Ok(sqlx::query_as::<_, User>(
            "INSERT INTO users (email, username, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(email)
        .bind(username)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    /// Delete a user; cards, ledger rows, spins and purchases cascade
    pub async fn delete_user(&self, user_id: UserId) -> CasinoResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CasinoError::not_found(format!("user {}", user_id)));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Credit cards
    // ---------------------------------------------------------------------

    pub async fn list_cards(&self, user_id: UserId) -> CasinoResult<Vec<CreditCard>> {
        Ok(
            sqlx::query_as::<_, CreditCard>("SELECT * FROM credit_cards WHERE user_id = ? ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn get_card(&self, card_id: CardId) -> CasinoResult<Option<CreditCard>> {
        Ok(sqlx::query_as::<_, CreditCard>("SELECT * FROM credit_cards WHERE id = ?")
            .bind(card_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Remove one of the user's cards; ledger rows keep their amounts and
    /// lose the reference
    pub async fn delete_card(&self, user_id: UserId, card_id: CardId) -> CasinoResult<()> {
        let result = sqlx::query("DELETE FROM credit_cards WHERE id = ? AND user_id = ?")
            .bind(card_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CasinoError::not_found(format!("card {}", card_id)));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Ledger
    // ---------------------------------------------------------------------

    /// The user's ledger, oldest first
    pub async fn list_transactions(&self, user_id: UserId) -> CasinoResult<Vec<LedgerEntry>> {
        Ok(
            sqlx::query_as::<_, LedgerEntry>("SELECT * FROM transactions WHERE user_id = ? ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn get_transaction(&self, transaction_id: TransactionId) -> CasinoResult<LedgerEntry> {
        sqlx::query_as::<_, LedgerEntry>("SELECT * FROM transactions WHERE id = ?")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CasinoError::not_found(format!("transaction {}", transaction_id)))
    }

    pub async fn find_idempotency(&self, key: &str) -> CasinoResult<Option<IdempotencyRecord>> {
        Ok(sqlx::query_as::<_, IdempotencyRecord>(
            "SELECT idempotency_key, user_id, operation, request_hash, transaction_id, balance_after \
             FROM idempotency_keys WHERE idempotency_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Stored balance and ledger sum for every user
    pub async fn balance_report(&self) -> CasinoResult<Vec<BalanceRow>> {
        Ok(sqlx::query_as::<_, BalanceRow>(
            "SELECT u.id AS user_id, u.tokens AS tokens, \
                    COALESCE(SUM(t.amount), 0) AS ledger_total \
             FROM users u LEFT JOIN transactions t ON t.user_id = u.id \
             GROUP BY u.id, u.tokens ORDER BY u.id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    // ---------------------------------------------------------------------
    // Food station
    // ---------------------------------------------------------------------

    /// Menu ordered by price
    pub async fn list_menu(&self) -> CasinoResult<Vec<FoodMenuItem>> {
        Ok(
            sqlx::query_as::<_, FoodMenuItem>("SELECT * FROM food_menu ORDER BY price, id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn get_menu_item(&self, item_id: MenuItemId) -> CasinoResult<Option<FoodMenuItem>> {
        Ok(sqlx::query_as::<_, FoodMenuItem>("SELECT * FROM food_menu WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_food_purchases(&self, user_id: UserId) -> CasinoResult<Vec<FoodPurchase>> {
        Ok(sqlx::query_as::<_, FoodPurchase>(
            "SELECT * FROM food_purchases WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
