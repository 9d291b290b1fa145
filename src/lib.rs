//! Casino Ledger - token wallet, slot machine and food station backend
//!
//! Balances live in SQLite next to an append-only transaction ledger. Every
//! change to a balance is written in the same database transaction as the
//! ledger row that explains it, so `balance == 100 + Σ amount` holds for
//! every user at all times.
//!
//! The library is layered leaves first:
//! - [`ledger`]: the store, its transactional boundary and the audit
//! - [`games`]: reel symbols, payout table and the slot state machine
//! - [`services`]: accounts, wallet, slots and food on top of the store
//! - [`api`]: the axum HTTP surface

pub mod api;
pub mod common;
pub mod config;
pub mod errors;
pub mod game_store;
pub mod games;
pub mod ledger;
pub mod services;

pub use common::types::{RequestContext, Tokens, TransactionType, UserId, STARTING_BALANCE};
pub use config::CasinoConfig;
pub use errors::{CasinoError, CasinoResult};
pub use ledger::{AuditReport, LedgerStore};
pub use services::{CasinoServices, ServiceBuilder};
