//! Slot machine state machine
//!
//! `Idle → Spinning → Resolved`, one type per state: a [`SlotMachine`] accepts
//! a bet, the [`Spinning`] handle can only be resolved against reels, and the
//! resulting [`SpinOutcome`] carries the payout.

use crate::errors::{CasinoError, CasinoResult};
use crate::games::reels::ReelSource;
use crate::games::types::{payout_for, Reels, SpinOutcome};

/// Idle machine with its betting limits
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotMachine {
    max_bet: Option<i64>,
}

impl SlotMachine {
    pub fn new(max_bet: Option<i64>) -> Self {
        Self { max_bet }
    }

    /// Accept a bet and start the reels
    pub fn pull(&self, bet: i64) -> CasinoResult<Spinning> {
        if bet <= 0 {
            return Err(CasinoError::validation("Bet must be a positive number of tokens"));
        }
        if let Some(max_bet) = self.max_bet {
            if bet > max_bet {
                return Err(CasinoError::validation(format!(
                    "Bet of {} exceeds the table limit of {}",
                    bet, max_bet
                )));
            }
        }
        Ok(Spinning { bet })
    }
}

/// A bet in flight
#[derive(Debug)]
#[must_use = "a spinning machine must be resolved"]
pub struct Spinning {
    bet: i64,
}

impl Spinning {
    pub fn bet(&self) -> i64 {
        self.bet
    }

    /// Stop the reels on `reels` and price the result
    pub fn resolve(self, reels: &Reels) -> CasinoResult<SpinOutcome> {
        let payout = payout_for(reels, self.bet)
            .ok_or_else(|| CasinoError::validation("Payout exceeds the token range"))?;

        Ok(SpinOutcome {
            bet: self.bet,
            reels: *reels,
            payout,
        })
    }

    /// Draw from `source` and resolve
    pub fn stop(self, source: &dyn ReelSource) -> CasinoResult<SpinOutcome> {
        let reels = source.draw();
        self.resolve(&reels)
    }
}
