//! Account cleanup coordinator
//!
//! Deleting an account first retracts every vote in its history from the
//! variation rosters, then deletes the account row, then voids the token
//! that requested the deletion. A failed retraction stops the sequence
//! before the row is deleted; since retraction is idempotent the whole
//! deletion can simply be retried.

use crate::error::{CoreError, CoreResult};
use crate::metrics;
use crate::model::{AccountId, ItemId};
use crate::rating::RatingEngine;
use crate::store::AccountStore;
use crate::token::TokenEngine;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct CleanupCoordinator {
    rating: RatingEngine,
    accounts: AccountStore,
    tokens: Arc<TokenEngine>,
}

impl CleanupCoordinator {
    pub fn new(rating: RatingEngine, accounts: AccountStore, tokens: Arc<TokenEngine>) -> Self {
        Self {
            rating,
            accounts,
            tokens,
        }
    }

    /// Retract all votes, delete the account and invalidate `token`
    pub async fn delete_account(&self, account: AccountId, token: &str) -> CoreResult<()> {
        let record = self
            .accounts
            .get_by_id(account)
            .await
            .map_err(|e| CoreError::storage("Failed to fetch account", e))?
            .ok_or_else(|| CoreError::not_found("Account not found"))?;

        let votes = record.votes.likes.iter().chain(record.votes.dislikes.iter());
        let mut retracted = 0usize;
        for item in votes {
            if self.rating.retract(account, ItemId(item)).await? {
                retracted += 1;
            }
        }

        self.accounts
            .delete(account)
            .await
            .map_err(|e| CoreError::storage("Failed to delete account", e))?;

        self.tokens.invalidate(token).await?;

        metrics::record_account_deleted();
        tracing::info!(%account, retracted, "Deleted account");
        Ok(())
    }
}
