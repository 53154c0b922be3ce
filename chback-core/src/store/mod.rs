//! Storage layer
//!
//! Two physically separate SQLite stores, each behind its own pool:
//! - content store: variations and their voter rosters
//! - account store: accounts, vote histories and the invalidated-token ledger
//!
//! Nothing here spans both stores; callers that touch both do so with two
//! independent writes.

pub mod accounts;
pub mod executor;
pub mod items;
pub mod migrations;

pub use accounts::{AccountRecord, AccountStore};
pub use executor::SqlExecutor;
pub use items::{ContentStore, ItemRecord};

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures at the query-executor boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Task join error: {0}")]
    Join(String),
}
