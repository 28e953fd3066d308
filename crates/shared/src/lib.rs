//! Shared types, errors, and configuration for Mizan.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for ledger records
//! - Rupiah formatting for balance responses
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, FinanceConfig};
pub use error::AppError;

#[cfg(test)]
mod error_tests;
