//! Ledger store: users, cards, the append-only transaction log and the
//! game/food records that accompany it

pub mod audit;
pub mod models;
pub mod store;
pub mod tx;

pub use audit::{audit, AuditReport, Discrepancy};
pub use models::*;
pub use store::LedgerStore;
pub use tx::LedgerTx;
