//! Slot spins settled against the ledger

use crate::common::types::{RequestContext, Tokens, TransactionType};
use crate::errors::CasinoResult;
use crate::game_store::SlotStats;
use crate::games::{ReelSource, Reels, SlotMachine};
use crate::ledger::{LedgerStore, NewLedgerEntry, SlotSpin};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Settled spin as returned to the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpinResult {
    pub spin_id: i64,
    pub reels: Reels,
    pub is_win: bool,
    pub payout: Tokens,
    /// `payout − bet`, the single ledger amount for this spin
    pub net: Tokens,
    pub new_balance: Tokens,
}

#[derive(Clone)]
pub struct SlotService {
    store: LedgerStore,
    machine: SlotMachine,
    reels: Arc<dyn ReelSource>,
}

impl SlotService {
    pub fn new(store: LedgerStore, machine: SlotMachine, reels: Arc<dyn ReelSource>) -> Self {
        Self { store, machine, reels }
    }

    /// Take the bet, draw the reels, and settle bet and payout in one
    /// transaction with a single `slot_win` entry of `payout − bet`.
    /// Reels are drawn only once the bet is covered.
    pub async fn spin(&self, ctx: &RequestContext, bet: Tokens) -> CasinoResult<SpinResult> {
        let spinning = self.machine.pull(bet)?;

        let mut tx = self.store.begin().await?;
        let mut new_balance = match tx.debit(ctx.user_id, bet).await {
            Ok(balance) => balance,
            Err(e) => {
                debug!(user_id = ctx.user_id, bet, error = %e, "Spin refused");
                return Err(e);
            }
        };

        let outcome = spinning.stop(self.reels.as_ref())?;
        if outcome.payout > 0 {
            new_balance = tx.credit(ctx.user_id, outcome.payout).await?;
        }

        let reels = outcome.reels.to_string();
        let spin = tx
            .insert_spin(ctx.user_id, bet, &reels, outcome.is_win(), outcome.payout)
            .await?;

        let description = if outcome.is_win() {
            format!("Slots win on {}: bet {}, paid {}.", reels, bet, outcome.payout)
        } else {
            format!("Slots loss on {}: bet {}.", reels, bet)
        };
        tx.append_transaction(NewLedgerEntry {
            user_id: ctx.user_id,
            card_id: None,
            transaction_type: TransactionType::SlotWin,
            amount: outcome.net(),
            description,
        })
        .await?;
        tx.commit().await?;

        info!(
            user_id = ctx.user_id,
            request_id = %ctx.request_id,
            bet,
            reels = %reels,
            payout = outcome.payout,
            new_balance,
            "Spin settled"
        );

        Ok(SpinResult {
            spin_id: spin.id,
            reels: outcome.reels,
            is_win: outcome.is_win(),
            payout: outcome.payout,
            net: outcome.net(),
            new_balance,
        })
    }

    /// The caller's most recent spins
    pub async fn history(&self, ctx: &RequestContext, limit: i64) -> CasinoResult<Vec<SlotSpin>> {
        self.store.list_spins(ctx.user_id, limit).await
    }

    pub async fn stats(&self) -> CasinoResult<SlotStats> {
        self.store.slot_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CasinoError;
    use crate::games::{FixedReels, Symbol};
    use crate::ledger::audit;

    async fn setup(script: Vec<Reels>) -> (SlotService, LedgerStore, RequestContext) {
        let store = LedgerStore::in_memory().await.unwrap();
        let user = store.create_user("ada@example.com", "ada").await.unwrap();
        let service = SlotService::new(
            store.clone(),
            SlotMachine::default(),
            Arc::new(FixedReels::new(script)),
        );
        (service, store, RequestContext::new(user.id))
    }

    fn triple(symbol: Symbol) -> Reels {
        Reels::new(symbol, symbol, symbol)
    }

    #[tokio::test]
    async fn test_losing_spin_records_negative_net() {
        let loss = Reels::new(Symbol::Cherry, Symbol::Lemon, Symbol::Seven);
        let (slots, store, ctx) = setup(vec![loss]).await;

        let result = slots.spin(&ctx, 10).await.unwrap();
        assert!(!result.is_win);
        assert_eq!(result.net, -10);
        assert_eq!(result.new_balance, 90);

        let ledger = store.list_transactions(ctx.user_id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].transaction_type, TransactionType::SlotWin);
        assert_eq!(ledger[0].amount, -10);
        assert!(audit(&store).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_winning_spin_records_net_once() {
        let (slots, store, ctx) = setup(vec![triple(Symbol::Orange)]).await;

        let result = slots.spin(&ctx, 10).await.unwrap();
        assert!(result.is_win);
        assert_eq!(result.payout, 50);
        assert_eq!(result.net, 40);
        assert_eq!(result.new_balance, 140);

        let ledger = store.list_transactions(ctx.user_id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].amount, 40);

        let spins = slots.history(&ctx, 10).await.unwrap();
        assert_eq!(spins[0].reels, "Orange-Orange-Orange");
        assert_eq!(spins[0].payout_amount, 50);
        assert!(audit(&store).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_whole_balance_bet_can_win() {
        let (slots, store, ctx) = setup(vec![triple(Symbol::Seven)]).await;

        let result = slots.spin(&ctx, 100).await.unwrap();
        assert_eq!(result.new_balance, 10_000);
        assert!(audit(&store).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_bet_above_balance_fails() {
        let (slots, store, ctx) = setup(vec![triple(Symbol::Cherry)]).await;

        assert!(matches!(
            slots.spin(&ctx, 101).await,
            Err(CasinoError::InsufficientFunds { required: 101, available: 100 })
        ));
        assert!(matches!(slots.spin(&ctx, 0).await, Err(CasinoError::Validation(_))));
        assert_eq!(store.get_user(ctx.user_id).await.unwrap().tokens, 100);
        assert_eq!(slots.stats().await.unwrap().spins, 0);
    }

    #[tokio::test]
    async fn test_refused_spin_leaves_reel_sequence_untouched() {
        let loss = Reels::new(Symbol::Bell, Symbol::Bar, Symbol::Bell);
        let (slots, _store, ctx) = setup(vec![triple(Symbol::Lemon), loss]).await;

        assert!(slots.spin(&ctx, 500).await.is_err());
        assert!(slots.spin(&ctx, -1).await.is_err());

        let first = slots.spin(&ctx, 10).await.unwrap();
        assert_eq!(first.reels, triple(Symbol::Lemon));
        let second = slots.spin(&ctx, 10).await.unwrap();
        assert_eq!(second.reels, loss);
    }

    #[tokio::test]
    async fn test_stats_aggregate_spins() {
        let loss = Reels::new(Symbol::Bell, Symbol::Bar, Symbol::Bell);
        let (slots, _store, ctx) = setup(vec![triple(Symbol::Cherry), loss]).await;

        slots.spin(&ctx, 10).await.unwrap();
        slots.spin(&ctx, 5).await.unwrap();

        let stats = slots.stats().await.unwrap();
        assert_eq!(stats.spins, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.total_wagered, 15);
        assert_eq!(stats.total_paid_out, 20);
    }
}
