//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the finance schema
//! - [`FinanceRepository`], the PostgreSQL implementation of the core store traits
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::FinanceRepository;

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use mizan_core::finance::FinanceStores;
use mizan_shared::config::DatabaseConfig;

/// Establishes a pooled connection using the configured pool bounds.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Wires all three finance stores to one PostgreSQL connection.
#[must_use]
pub fn finance_stores(db: DatabaseConnection) -> FinanceStores {
    FinanceStores::from_backend(Arc::new(FinanceRepository::new(db)))
}
