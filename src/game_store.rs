//! Persistent slot records: spin history and house statistics.

use crate::{
    common::types::{Tokens, UserId},
    errors::CasinoResult,
    ledger::{models::SlotSpin, LedgerStore},
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Upper bound on spin history rows returned in one call
pub const MAX_SPIN_HISTORY: i64 = 500;

impl LedgerStore {
    /// The user's spins, newest first
    pub async fn list_spins(&self, user_id: UserId, limit: i64) -> CasinoResult<Vec<SlotSpin>> {
        let limit = limit.clamp(1, MAX_SPIN_HISTORY);
        Ok(sqlx::query_as::<_, SlotSpin>(
            "SELECT * FROM slots_spins WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?)
    }

    /// House-wide totals over every recorded spin
    pub async fn slot_stats(&self) -> CasinoResult<SlotStats> {
        let stats = sqlx::query_as::<_, SlotStats>(
            "SELECT COUNT(*) AS spins, \
                    COALESCE(SUM(CASE WHEN is_win THEN 1 ELSE 0 END), 0) AS wins, \
                    COALESCE(SUM(bet_amount), 0) AS total_wagered, \
                    COALESCE(SUM(payout_amount), 0) AS total_paid_out \
             FROM slots_spins",
        )
        .fetch_one(self.pool())
        .await?;

        tracing::debug!(spins = stats.spins, wins = stats.wins, "Loaded slot statistics");
        Ok(stats)
    }
}

// ============================================================================
// Casino Statistics
// ============================================================================

/// Aggregate slot performance for the house
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SlotStats {
    pub spins: i64,
    pub wins: i64,
    pub total_wagered: Tokens,
    pub total_paid_out: Tokens,
}

impl SlotStats {
    /// Tokens the house kept; negative when players are ahead
    pub fn house_edge(&self) -> Tokens {
        self.total_wagered - self.total_paid_out
    }

    /// Share of paid-out tokens per wagered token, 0.0 before the first spin
    pub fn return_to_player(&self) -> f64 {
        if self.total_wagered == 0 {
            0.0
        } else {
            self.total_paid_out as f64 / self.total_wagered as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_stats() {
        let store = LedgerStore::in_memory().await.unwrap();
        let stats = store.slot_stats().await.unwrap();

        assert_eq!(stats, SlotStats::default());
        assert_eq!(stats.return_to_player(), 0.0);
    }

    #[tokio::test]
    async fn test_stats_and_history_follow_spins() {
        let store = LedgerStore::in_memory().await.unwrap();
        let user = store.create_user("ada@example.com", "ada").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_spin(user.id, 10, "Cherry-Cherry-Cherry", true, 20).await.unwrap();
        tx.insert_spin(user.id, 5, "Bell-Bar-Seven", false, 0).await.unwrap();
        tx.commit().await.unwrap();

        let stats = store.slot_stats().await.unwrap();
        assert_eq!(stats.spins, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.total_wagered, 15);
        assert_eq!(stats.total_paid_out, 20);
        assert_eq!(stats.house_edge(), -5);

        let history = store.list_spins(user.id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].reels, "Bell-Bar-Seven");

        assert_eq!(store.list_spins(user.id, 1).await.unwrap().len(), 1);
    }
}
