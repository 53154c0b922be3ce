//! Core of the chback rating backend
//!
//! Bearer-token authentication plus like/dislike voting over two
//! independently stored views of the same relationship: the per-variation
//! voter roster (content store) and the per-account vote history (account
//! store).

pub mod accounts;
pub mod backend;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod health;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod rating;
pub mod reconcile;
pub mod store;
pub mod token;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::{Backend, OpenError};
pub use config::Config;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};
pub use model::{AccountId, IdSet, ItemId, Timestamp, VoteKind, VoteLists};
pub use rating::VoteOp;
pub use token::Principal;
