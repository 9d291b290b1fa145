//! Casino HTTP API
//!
//! JSON request/response surface over the service layer, for the UI that
//! fronts the casino.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod monitoring;
pub mod routes;
pub mod server;

pub use server::{build_app, ApiServer};
