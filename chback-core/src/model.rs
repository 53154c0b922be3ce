/*
    model.rs - Domain types shared by the engines

    Defines:
    - Timestamps (epoch milliseconds)
    - Account and item identifiers
    - IdSet, the in-memory form of a stored vote list
    - VoteLists and VoteKind
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Separator used when a vote list is persisted as a single string
pub const LIST_SEPARATOR: char = ';';

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a timestamp representing the current time
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Timestamp(millis)
    }

    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn as_secs(&self) -> i64 {
        self.0.div_euclid(1000)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(AccountId)
    }
}

/// Numeric identifier of a rated variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ItemId)
    }
}

/// Ordered, duplicate-free set of numeric ids
///
/// Insertion order is preserved so the stored string stays stable across
/// rewrites. Membership is integer equality, never substring matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSet(Vec<i64>);

impl IdSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse the stored form, skipping blank and non-numeric fragments
    pub fn parse(stored: &str) -> Self {
        let mut set = IdSet::new();
        for fragment in stored.split(LIST_SEPARATOR) {
            if let Ok(id) = fragment.trim().parse::<i64>() {
                set.insert(id);
            }
        }
        set
    }

    /// Serialize to the stored form
    pub fn to_stored(&self) -> String {
        self.to_string()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    /// Append `id`; returns false if it was already present
    pub fn insert(&mut self, id: i64) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Remove `id`; returns false if it was absent
    pub fn remove(&mut self, id: i64) -> bool {
        match self.0.iter().position(|&existing| existing == id) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, id) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "{}", LIST_SEPARATOR)?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

impl FromIterator<i64> for IdSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut set = IdSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Which way a vote goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn opposite(&self) -> Self {
        match self {
            VoteKind::Like => VoteKind::Dislike,
            VoteKind::Dislike => VoteKind::Like,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Like => "like",
            VoteKind::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A likes/dislikes pair, as held by both an item roster and an account history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLists {
    pub likes: IdSet,
    pub dislikes: IdSet,
}

impl VoteLists {
    pub fn parse(likes: &str, dislikes: &str) -> Self {
        Self {
            likes: IdSet::parse(likes),
            dislikes: IdSet::parse(dislikes),
        }
    }

    pub fn list(&self, kind: VoteKind) -> &IdSet {
        match kind {
            VoteKind::Like => &self.likes,
            VoteKind::Dislike => &self.dislikes,
        }
    }

    pub fn list_mut(&mut self, kind: VoteKind) -> &mut IdSet {
        match kind {
            VoteKind::Like => &mut self.likes,
            VoteKind::Dislike => &mut self.dislikes,
        }
    }

    /// Current vote recorded for `id`, if any
    pub fn vote_of(&self, id: i64) -> Option<VoteKind> {
        if self.likes.contains(id) {
            Some(VoteKind::Like)
        } else if self.dislikes.contains(id) {
            Some(VoteKind::Dislike)
        } else {
            None
        }
    }
}
