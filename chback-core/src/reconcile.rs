//! Drift detection and repair between variation rosters and account histories
//!
//! The rating engine writes the variation first, so after a partial failure
//! the roster is the side to trust. Reconciliation rewrites account
//! histories to match the rosters and retracts roster entries whose account
//! no longer exists.

use crate::error::{CoreError, CoreResult};
use crate::metrics;
use crate::model::{AccountId, ItemId, VoteKind, VoteLists};
use crate::rating::RatingEngine;
use crate::store::{AccountStore, ContentStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One disagreement between the two stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Drift {
    /// Roster holds the vote, account history does not
    MissingFromHistory {
        account: AccountId,
        item: ItemId,
        kind: VoteKind,
    },
    /// Account history holds the vote, roster does not (or the variation is gone)
    MissingFromRoster {
        account: AccountId,
        item: ItemId,
        kind: VoteKind,
    },
    /// Roster names an account that no longer exists
    OrphanedVote {
        account: AccountId,
        item: ItemId,
        kind: VoteKind,
    },
    /// Roster lists the account as both liking and disliking
    DoubleVote { account: AccountId, item: ItemId },
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Drift::MissingFromHistory { account, item, kind } => {
                write!(f, "variation {} has a {} from account {} missing in its history", item, kind, account)
            }
            Drift::MissingFromRoster { account, item, kind } => {
                write!(f, "account {} has a {} on variation {} missing in its roster", account, kind, item)
            }
            Drift::OrphanedVote { account, item, kind } => {
                write!(f, "variation {} has a {} from deleted account {}", item, kind, account)
            }
            Drift::DoubleVote { account, item } => {
                write!(f, "variation {} lists account {} as both liking and disliking", item, account)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub variations_scanned: usize,
    pub accounts_scanned: usize,
    pub drift: Vec<Drift>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.drift.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub drift_found: usize,
    pub histories_rewritten: usize,
    pub orphans_retracted: usize,
    pub double_votes_cleared: usize,
}

#[derive(Clone, Debug)]
pub struct Reconciler {
    content: ContentStore,
    accounts: AccountStore,
    rating: RatingEngine,
}

impl Reconciler {
    pub fn new(content: ContentStore, accounts: AccountStore, rating: RatingEngine) -> Self {
        Self {
            content,
            accounts,
            rating,
        }
    }

    /// Scan both stores and list every disagreement
    pub async fn audit(&self) -> CoreResult<AuditReport> {
        let items = self
            .content
            .list()
            .await
            .map_err(|e| CoreError::storage("Failed to list variations", e))?;
        let accounts = self
            .accounts
            .list()
            .await
            .map_err(|e| CoreError::storage("Failed to list accounts", e))?;

        let rosters: BTreeMap<ItemId, VoteLists> =
            items.into_iter().map(|item| (item.id, item.votes)).collect();
        let histories: BTreeMap<AccountId, VoteLists> = accounts
            .into_iter()
            .map(|account| (account.id, account.votes))
            .collect();

        let drift = find_drift(&rosters, &histories);
        if !drift.is_empty() {
            tracing::warn!(entries = drift.len(), "Stores disagree");
        }

        Ok(AuditReport {
            variations_scanned: rosters.len(),
            accounts_scanned: histories.len(),
            drift,
        })
    }

    /// Repair all drift, trusting the rosters
    pub async fn reconcile(&self) -> CoreResult<ReconcileSummary> {
        let report = self.audit().await?;
        let mut summary = ReconcileSummary {
            drift_found: report.drift.len(),
            ..Default::default()
        };

        let mut touched: BTreeSet<AccountId> = BTreeSet::new();
        for drift in &report.drift {
            match *drift {
                Drift::MissingFromHistory { account, .. } | Drift::MissingFromRoster { account, .. } => {
                    touched.insert(account);
                }
                Drift::OrphanedVote { account, item, .. } => {
                    if self.rating.retract(account, item).await? {
                        summary.orphans_retracted += 1;
                    }
                }
                // Neither vote can be trusted; drop both sides
                Drift::DoubleVote { account, item } => {
                    if self.rating.retract(account, item).await? {
                        summary.double_votes_cleared += 1;
                    }
                    touched.insert(account);
                }
            }
        }

        for account in touched {
            let Some(record) = self
                .accounts
                .get_by_id(account)
                .await
                .map_err(|e| CoreError::storage("Failed to fetch account", e))?
            else {
                continue;
            };

            let mut history = record.votes.clone();
            for drift in report.drift.iter().filter(|d| d.account() == account) {
                match *drift {
                    Drift::MissingFromRoster { item, kind, .. } => {
                        history.list_mut(kind).remove(item.0);
                    }
                    Drift::MissingFromHistory { item, kind, .. } => {
                        history.list_mut(kind.opposite()).remove(item.0);
                        history.list_mut(kind).insert(item.0);
                    }
                    Drift::DoubleVote { item, .. } => {
                        history.likes.remove(item.0);
                        history.dislikes.remove(item.0);
                    }
                    Drift::OrphanedVote { .. } => {}
                }
            }

            if history != record.votes {
                self.accounts
                    .update_votes(account, &history)
                    .await
                    .map_err(|e| CoreError::storage("Failed to update account", e))?;
                summary.histories_rewritten += 1;
            }
        }

        metrics::record_reconciled(summary.drift_found as u64);
        tracing::info!(
            drift = summary.drift_found,
            histories = summary.histories_rewritten,
            orphans = summary.orphans_retracted,
            double_votes = summary.double_votes_cleared,
            "Reconciled stores"
        );
        Ok(summary)
    }
}

impl Drift {
    pub fn account(&self) -> AccountId {
        match self {
            Drift::MissingFromHistory { account, .. }
            | Drift::MissingFromRoster { account, .. }
            | Drift::OrphanedVote { account, .. }
            | Drift::DoubleVote { account, .. } => *account,
        }
    }
}

/// Pure comparison of rosters against histories
pub fn find_drift(
    rosters: &BTreeMap<ItemId, VoteLists>,
    histories: &BTreeMap<AccountId, VoteLists>,
) -> Vec<Drift> {
    let mut drift = Vec::new();

    for (&item, roster) in rosters {
        for id in roster.likes.iter().filter(|id| roster.dislikes.contains(*id)) {
            drift.push(Drift::DoubleVote { account: AccountId(id), item });
        }

        for kind in [VoteKind::Like, VoteKind::Dislike] {
            for id in roster.list(kind).iter() {
                if roster.list(kind.opposite()).contains(id) {
                    continue;
                }
                let account = AccountId(id);
                match histories.get(&account) {
                    None => drift.push(Drift::OrphanedVote { account, item, kind }),
                    Some(history) if !history.list(kind).contains(item.0) => {
                        drift.push(Drift::MissingFromHistory { account, item, kind })
                    }
                    Some(_) => {}
                }
            }
        }
    }

    for (&account, history) in histories {
        for kind in [VoteKind::Like, VoteKind::Dislike] {
            for id in history.list(kind).iter() {
                let item = ItemId(id);
                let recorded = rosters
                    .get(&item)
                    .map(|roster| roster.list(kind).contains(account.0))
                    .unwrap_or(false);
                if !recorded {
                    drift.push(Drift::MissingFromRoster { account, item, kind });
                }
            }
        }
    }

    drift.sort();
    drift
}
