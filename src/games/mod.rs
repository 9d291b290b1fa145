pub mod reels;
pub mod slots;
pub mod types;

pub use reels::{FixedReels, ReelSource, SeededReels, ThreadRngReels};
pub use slots::{SlotMachine, Spinning};
pub use types::*;
