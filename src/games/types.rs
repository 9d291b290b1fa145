use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of reels on the machine
pub const REEL_COUNT: usize = 3;

/// Reel symbol
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Symbol {
    Cherry,
    Lemon,
    Orange,
    Bell,
    Bar,
    Seven,
}

impl Symbol {
    pub const ALL: [Symbol; 6] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Orange,
        Symbol::Bell,
        Symbol::Bar,
        Symbol::Seven,
    ];

    /// Relative draw weight; the weights of all symbols sum to 100
    pub fn weight(self) -> u32 {
        match self {
            Symbol::Cherry => 30,
            Symbol::Lemon => 25,
            Symbol::Orange => 20,
            Symbol::Bell => 15,
            Symbol::Bar => 8,
            Symbol::Seven => 2,
        }
    }

    /// Bet multiplier for three of this symbol
    pub fn multiplier(self) -> i64 {
        match self {
            Symbol::Cherry => 2,
            Symbol::Lemon => 3,
            Symbol::Orange => 5,
            Symbol::Bell => 10,
            Symbol::Bar => 25,
            Symbol::Seven => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::Cherry => "Cherry",
            Symbol::Lemon => "Lemon",
            Symbol::Orange => "Orange",
            Symbol::Bell => "Bell",
            Symbol::Bar => "Bar",
            Symbol::Seven => "Seven",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::ALL
            .into_iter()
            .find(|symbol| symbol.as_str() == s)
            .ok_or_else(|| format!("unknown symbol '{}'", s))
    }
}

/// The three symbols shown after a spin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reels(pub [Symbol; REEL_COUNT]);

impl Reels {
    pub fn new(first: Symbol, second: Symbol, third: Symbol) -> Self {
        Self([first, second, third])
    }

    pub fn symbols(&self) -> &[Symbol; REEL_COUNT] {
        &self.0
    }

    /// The matching symbol when all reels agree
    pub fn triple(&self) -> Option<Symbol> {
        let [a, b, c] = self.0;
        (a == b && b == c).then_some(a)
    }
}

impl fmt::Display for Reels {
    /// Stored form, e.g. `Cherry-Lemon-Bar`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{}-{}-{}", a, b, c)
    }
}

impl FromStr for Reels {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbols: Vec<Symbol> = s.split('-').map(str::parse).collect::<Result<_, _>>()?;
        let symbols: [Symbol; REEL_COUNT] = symbols
            .try_into()
            .map_err(|_| format!("expected {} reels in '{}'", REEL_COUNT, s))?;
        Ok(Reels(symbols))
    }
}

/// Payout for a bet on the given reels: three of a kind pays
/// `bet × multiplier`, anything else pays nothing
///
/// Returns `None` if the payout does not fit in an `i64`.
pub fn payout_for(reels: &Reels, bet: i64) -> Option<i64> {
    match reels.triple() {
        Some(symbol) => bet.checked_mul(symbol.multiplier()),
        None => Some(0),
    }
}

/// Resolved spin, before settlement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpinOutcome {
    pub bet: i64,
    pub reels: Reels,
    pub payout: i64,
}

impl SpinOutcome {
    pub fn is_win(&self) -> bool {
        self.payout > 0
    }

    /// Balance change for the player: `payout − bet`
    pub fn net(&self) -> i64 {
        self.payout - self.bet
    }
}
