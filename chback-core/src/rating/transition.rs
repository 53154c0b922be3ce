//! Vote state machine for one (account, item) pair
//!
//! The pair's vote is mirrored in two places: the item roster holds the
//! account id, the account history holds the item id. Transitions here are
//! pure and always change both sides together.

use crate::error::CoreError;
use crate::model::{AccountId, ItemId, VoteKind, VoteLists};
use std::fmt;

/// Rating operation requested by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteOp {
    Like,
    Dislike,
    Unlike,
    Undislike,
}

impl VoteOp {
    pub const ALL: [VoteOp; 4] = [VoteOp::Like, VoteOp::Dislike, VoteOp::Unlike, VoteOp::Undislike];

    /// The list this operation adds to or removes from
    pub fn kind(&self) -> VoteKind {
        match self {
            VoteOp::Like | VoteOp::Unlike => VoteKind::Like,
            VoteOp::Dislike | VoteOp::Undislike => VoteKind::Dislike,
        }
    }

    /// True for like/dislike, false for the retractions
    pub fn is_cast(&self) -> bool {
        matches!(self, VoteOp::Like | VoteOp::Dislike)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteOp::Like => "like",
            VoteOp::Dislike => "dislike",
            VoteOp::Unlike => "unlike",
            VoteOp::Undislike => "undislike",
        }
    }
}

impl fmt::Display for VoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A redundant vote or unvote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub op: VoteOp,
    /// Only one of the two sides recorded the vote
    pub one_sided: bool,
}

impl Conflict {
    pub fn message(&self) -> &'static str {
        match self.op {
            VoteOp::Like => "Already liked",
            VoteOp::Dislike => "Already disliked",
            VoteOp::Unlike => "Not liked",
            VoteOp::Undislike => "Not disliked",
        }
    }
}

impl From<Conflict> for CoreError {
    fn from(conflict: Conflict) -> Self {
        CoreError::conflict(conflict.message())
    }
}

/// Apply `op` to the pair, returning the new (roster, history)
///
/// Casting a vote conflicts if either side already holds it, so a
/// single-sided record is reported rather than written twice. Retracting
/// requires both sides to hold the vote.
pub fn apply(
    op: VoteOp,
    account: AccountId,
    item: ItemId,
    roster: &VoteLists,
    history: &VoteLists,
) -> Result<(VoteLists, VoteLists), Conflict> {
    let kind = op.kind();
    let in_roster = roster.list(kind).contains(account.0);
    let in_history = history.list(kind).contains(item.0);

    let blocked = if op.is_cast() {
        in_roster || in_history
    } else {
        !(in_roster && in_history)
    };
    if blocked {
        return Err(Conflict {
            op,
            one_sided: in_roster != in_history,
        });
    }

    let mut roster = roster.clone();
    let mut history = history.clone();

    if op.is_cast() {
        // Switching sides clears the opposite vote first
        let opposite = kind.opposite();
        roster.list_mut(opposite).remove(account.0);
        history.list_mut(opposite).remove(item.0);

        roster.list_mut(kind).insert(account.0);
        history.list_mut(kind).insert(item.0);
    } else {
        roster.list_mut(kind).remove(account.0);
        history.list_mut(kind).remove(item.0);
    }

    Ok((roster, history))
}

/// Remove `account` from both lists of a roster; false if it was absent
pub fn retract(roster: &mut VoteLists, account: AccountId) -> bool {
    let liked = roster.likes.remove(account.0);
    let disliked = roster.dislikes.remove(account.0);
    liked || disliked
}
