//! Metrics for token and vote activity
//!
//! Recording goes through the `metrics` facade; nothing is exported unless a
//! recorder (e.g. the Prometheus exporter in the API binary) is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize metrics with descriptions
pub fn init_metrics() {
    // Tokens
    describe_counter!("tokens.issued", "Number of tokens issued");
    describe_counter!("tokens.rejected", "Number of tokens rejected, by reason");
    describe_counter!("tokens.invalidated", "Number of tokens appended to the ledger");

    // Votes
    describe_counter!("votes.applied", "Number of successful vote transitions, by operation");
    describe_counter!("votes.conflicts", "Number of redundant votes or unvotes, by operation");
    describe_counter!(
        "votes.partial_writes",
        "Votes written to the variation but not to the account"
    );
    describe_histogram!("votes.duration_ms", "Vote operation duration in milliseconds");

    // Accounts
    describe_counter!("accounts.registered", "Number of accounts created");
    describe_counter!("accounts.deleted", "Number of accounts deleted");
    describe_counter!("accounts.reconciled", "Number of drift entries repaired by reconcile");
}

pub fn record_token_issued() {
    counter!("tokens.issued").increment(1);
}

pub fn record_token_rejected(reason: &'static str) {
    counter!("tokens.rejected", "reason" => reason).increment(1);
}

pub fn record_token_invalidated() {
    counter!("tokens.invalidated").increment(1);
}

pub fn record_vote_applied(op: &'static str) {
    counter!("votes.applied", "op" => op).increment(1);
}

pub fn record_vote_conflict(op: &'static str) {
    counter!("votes.conflicts", "op" => op).increment(1);
}

pub fn record_partial_write() {
    counter!("votes.partial_writes").increment(1);
}

pub fn record_account_registered() {
    counter!("accounts.registered").increment(1);
}

pub fn record_account_deleted() {
    counter!("accounts.deleted").increment(1);
}

pub fn record_reconciled(entries: u64) {
    counter!("accounts.reconciled").increment(entries);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}
