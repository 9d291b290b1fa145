//! Common utilities and shared functionality

pub mod config;
pub mod types;
