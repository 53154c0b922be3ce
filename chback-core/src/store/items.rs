//! Content store: variations and their voter rosters

use super::executor::SqlExecutor;
use super::migrations;
use super::StoreResult;
use crate::model::{ItemId, VoteLists};
use rusqlite::types::Value;
use rusqlite::Row;

/// A variation row; only the roster is mutated by the rating engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub value: String,
    pub votes: VoteLists,
}

impl ItemRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let likes: String = row.get(2)?;
        let dislikes: String = row.get(3)?;
        Ok(Self {
            id: ItemId(row.get(0)?),
            value: row.get(1)?,
            votes: VoteLists::parse(&likes, &dislikes),
        })
    }
}

/// Access to the `variations` table
#[derive(Clone, Debug)]
pub struct ContentStore {
    exec: SqlExecutor,
}

impl ContentStore {
    pub fn new(exec: SqlExecutor) -> Self {
        Self { exec }
    }

    pub fn executor(&self) -> &SqlExecutor {
        &self.exec
    }

    /// Bring the schema up to date
    pub fn migrate(&self) -> StoreResult<usize> {
        self.exec.migrate(&migrations::content_migrations())
    }

    pub async fn get(&self, id: ItemId) -> StoreResult<Option<ItemRecord>> {
        self.exec
            .query(
                "SELECT id, value, likes, dislikes FROM variations WHERE id = ?",
                vec![Value::from(id.0)],
                |rows| match rows.next()? {
                    Some(row) => ItemRecord::from_row(row).map(Some),
                    None => Ok(None),
                },
            )
            .await
    }

    /// Every variation, ordered by id
    pub async fn list(&self) -> StoreResult<Vec<ItemRecord>> {
        self.exec
            .query(
                "SELECT id, value, likes, dislikes FROM variations ORDER BY id",
                vec![],
                |rows| {
                    let mut items = Vec::new();
                    while let Some(row) = rows.next()? {
                        items.push(ItemRecord::from_row(row)?);
                    }
                    Ok(items)
                },
            )
            .await
    }

    /// Add a variation with an empty roster
    ///
    /// Variations belong to the catalog; this exists for seeding and tests.
    pub async fn create(&self, value: &str) -> StoreResult<ItemId> {
        let id = self
            .exec
            .insert(
                "INSERT INTO variations (value) VALUES (?)",
                vec![Value::from(value.to_string())],
            )
            .await?;
        // A plain INSERT either inserts or errors
        Ok(ItemId(id.unwrap_or_default()))
    }

    /// Add a variation under a fixed id, leaving an existing one untouched
    pub async fn create_with_id(&self, id: ItemId, value: &str) -> StoreResult<bool> {
        let inserted = self
            .exec
            .insert(
                "INSERT OR IGNORE INTO variations (id, value) VALUES (?, ?)",
                vec![Value::from(id.0), Value::from(value.to_string())],
            )
            .await?;
        Ok(inserted.is_some())
    }

    /// Overwrite the roster; false if the variation does not exist
    pub async fn update_votes(&self, id: ItemId, votes: &VoteLists) -> StoreResult<bool> {
        let changed = self
            .exec
            .update(
                "UPDATE variations SET likes = ?, dislikes = ? WHERE id = ?",
                vec![
                    Value::from(votes.likes.to_stored()),
                    Value::from(votes.dislikes.to_stored()),
                    Value::from(id.0),
                ],
            )
            .await?;
        Ok(changed > 0)
    }
}
