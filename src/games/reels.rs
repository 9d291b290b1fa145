//! Reel draws
//!
//! The slot service takes its randomness from a [`ReelSource`] so tests and
//! replays can pin the outcome.

use crate::games::types::{Reels, Symbol, REEL_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Produces the symbols for one spin
pub trait ReelSource: Send + Sync {
    fn draw(&self) -> Reels;
}

/// Draw three weighted symbols from any RNG
pub fn draw_weighted<R: Rng + ?Sized>(rng: &mut R) -> Reels {
    let mut symbols = [Symbol::Cherry; REEL_COUNT];
    for slot in symbols.iter_mut() {
        *slot = pick_symbol(rng.gen_range(0..total_weight()));
    }
    Reels(symbols)
}

fn total_weight() -> u32 {
    Symbol::ALL.iter().map(|s| s.weight()).sum()
}

/// Map a roll in `0..total_weight()` onto the cumulative weight table
fn pick_symbol(mut roll: u32) -> Symbol {
    for symbol in Symbol::ALL {
        if roll < symbol.weight() {
            return symbol;
        }
        roll -= symbol.weight();
    }
    Symbol::Seven
}

/// Thread-local entropy
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngReels;

impl ReelSource for ThreadRngReels {
    fn draw(&self) -> Reels {
        draw_weighted(&mut rand::thread_rng())
    }
}

/// Reproducible draws from a fixed seed
pub struct SeededReels {
    rng: Mutex<StdRng>,
}

impl SeededReels {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ReelSource for SeededReels {
    fn draw(&self) -> Reels {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        draw_weighted(&mut *rng)
    }
}

/// Scripted outcomes, replayed in order and cycled once exhausted
pub struct FixedReels {
    script: Mutex<VecDeque<Reels>>,
}

impl FixedReels {
    /// An empty script falls back to three cherries
    pub fn new(script: impl IntoIterator<Item = Reels>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    /// Always land on the same reels
    pub fn always(reels: Reels) -> Self {
        Self::new([reels])
    }
}

impl ReelSource for FixedReels {
    fn draw(&self) -> Reels {
        let mut script = self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match script.pop_front() {
            Some(reels) => {
                script.push_back(reels);
                reels
            }
            None => Reels::new(Symbol::Cherry, Symbol::Cherry, Symbol::Cherry),
        }
    }
}
