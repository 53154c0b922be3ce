//! Rating engine
//!
//! Applies like/dislike/unlike/undislike to a variation roster (content
//! store) and an account history (account store). The two stores share no
//! transaction, so every successful operation is two independent writes in
//! a fixed order: the variation first, then the account. If the second
//! write fails the roster is ahead of the history; that is reported as an
//! internal error and left for the reconciler.

mod transition;

pub use transition::{apply as apply_transition, Conflict, VoteOp};

use crate::error::{CoreError, CoreResult};
use crate::metrics::{self, Timer};
use crate::model::{AccountId, ItemId};
use crate::store::{AccountStore, ContentStore};

pub const MSG_VARIATION_NOT_FOUND: &str = "Variation not found";
pub const MSG_ACCOUNT_NOT_FOUND: &str = "Account not found";
pub const MSG_VARIATION_WRITE_FAILED: &str = "Failed to update variation";
pub const MSG_PARTIAL_WRITE: &str =
    "Vote recorded on variation but not on account; stores need reconciliation";

#[derive(Clone, Debug)]
pub struct RatingEngine {
    content: ContentStore,
    accounts: AccountStore,
}

impl RatingEngine {
    pub fn new(content: ContentStore, accounts: AccountStore) -> Self {
        Self { content, accounts }
    }

    pub async fn like(&self, account: AccountId, item: ItemId) -> CoreResult<()> {
        self.apply(VoteOp::Like, account, item).await
    }

    pub async fn dislike(&self, account: AccountId, item: ItemId) -> CoreResult<()> {
        self.apply(VoteOp::Dislike, account, item).await
    }

    pub async fn unlike(&self, account: AccountId, item: ItemId) -> CoreResult<()> {
        self.apply(VoteOp::Unlike, account, item).await
    }

    pub async fn undislike(&self, account: AccountId, item: ItemId) -> CoreResult<()> {
        self.apply(VoteOp::Undislike, account, item).await
    }

    /// Load both sides, run the transition, write variation then account
    pub async fn apply(&self, op: VoteOp, account: AccountId, item: ItemId) -> CoreResult<()> {
        let timer = Timer::new("votes.duration_ms");

        let variation = self
            .content
            .get(item)
            .await
            .map_err(|e| CoreError::storage("Failed to fetch variation", e))?
            .ok_or_else(|| CoreError::not_found(MSG_VARIATION_NOT_FOUND))?;

        let holder = self
            .accounts
            .get_by_id(account)
            .await
            .map_err(|e| CoreError::storage("Failed to fetch account", e))?
            .ok_or_else(|| CoreError::not_found(MSG_ACCOUNT_NOT_FOUND))?;

        let (roster, history) =
            match transition::apply(op, account, item, &variation.votes, &holder.votes) {
                Ok(pair) => pair,
                Err(conflict) => {
                    metrics::record_vote_conflict(op.as_str());
                    if conflict.one_sided {
                        tracing::warn!(
                            %account, %item, %op,
                            "Vote recorded on only one side of the pair"
                        );
                    }
                    return Err(conflict.into());
                }
            };

        let written = self
            .content
            .update_votes(item, &roster)
            .await
            .map_err(|e| CoreError::storage(MSG_VARIATION_WRITE_FAILED, e))?;
        if !written {
            return Err(CoreError::not_found(MSG_VARIATION_NOT_FOUND));
        }

        match self.accounts.update_votes(account, &history).await {
            Ok(true) => {}
            Ok(false) => return Err(partial_write(op, account, item, "account row missing")),
            Err(e) => return Err(partial_write(op, account, item, &e.to_string())),
        }

        metrics::record_vote_applied(op.as_str());
        timer.stop();
        tracing::debug!(%account, %item, %op, "Vote applied");
        Ok(())
    }

    /// Remove `account` from a variation's roster, whatever its vote
    ///
    /// Idempotent: a missing variation or an account not on the roster is
    /// not an error, and nothing is written unless the roster changes.
    /// Returns whether the roster changed. Account histories are untouched.
    pub async fn retract(&self, account: AccountId, item: ItemId) -> CoreResult<bool> {
        let variation = match self
            .content
            .get(item)
            .await
            .map_err(|e| CoreError::storage("Failed to fetch variation", e))?
        {
            Some(variation) => variation,
            None => return Ok(false),
        };

        let mut roster = variation.votes;
        if !transition::retract(&mut roster, account) {
            return Ok(false);
        }

        self.content
            .update_votes(item, &roster)
            .await
            .map_err(|e| CoreError::storage(MSG_VARIATION_WRITE_FAILED, e))?;

        tracing::debug!(%account, %item, "Retracted vote from variation");
        Ok(true)
    }
}

fn partial_write(op: VoteOp, account: AccountId, item: ItemId, cause: &str) -> CoreError {
    metrics::record_partial_write();
    tracing::error!(
        %account, %item, %op, cause,
        "Variation updated but account history was not; stores disagree"
    );
    CoreError::internal(MSG_PARTIAL_WRITE)
}
