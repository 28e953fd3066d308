//! Core business logic for Mizan.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached through the traits in [`finance::store`]; `mizan-db`
//! implements them on PostgreSQL.
//!
//! # Modules
//!
//! - `finance` - Income/expense ledger, balance recomputation, period cache
//!   invalidation, and period reports

pub mod finance;
