//! Account store: identities, credentials and vote histories

use super::executor::SqlExecutor;
use super::migrations;
use super::StoreResult;
use crate::model::{AccountId, Timestamp, VoteLists};
use rusqlite::types::Value;
use rusqlite::Row;

#[derive(Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: AccountId,
    pub email: String,
    pub pwhash: String,
    /// Last credential change, epoch millis; 0 if never changed
    pub last_pw_change: Timestamp,
    pub votes: VoteLists,
}

impl AccountRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let likes: String = row.get(4)?;
        let dislikes: String = row.get(5)?;
        Ok(Self {
            id: AccountId(row.get(0)?),
            email: row.get(1)?,
            pwhash: row.get(2)?,
            last_pw_change: Timestamp::from_millis(row.get(3)?),
            votes: VoteLists::parse(&likes, &dislikes),
        })
    }
}

// Keep the hash out of logs
impl std::fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("last_pw_change", &self.last_pw_change)
            .field("votes", &self.votes)
            .finish_non_exhaustive()
    }
}

/// Access to the `accounts` table
#[derive(Clone, Debug)]
pub struct AccountStore {
    exec: SqlExecutor,
}

impl AccountStore {
    pub fn new(exec: SqlExecutor) -> Self {
        Self { exec }
    }

    pub fn executor(&self) -> &SqlExecutor {
        &self.exec
    }

    /// Bring the schema up to date
    pub fn migrate(&self) -> StoreResult<usize> {
        self.exec.migrate(&migrations::account_migrations())
    }

    pub async fn get_by_email(&self, email: &str) -> StoreResult<Option<AccountRecord>> {
        self.exec
            .query(
                "SELECT id, email, pwhash, last_pw_change, likes, dislikes FROM accounts WHERE email = ?",
                vec![Value::from(email.to_string())],
                first_account,
            )
            .await
    }

    pub async fn get_by_id(&self, id: AccountId) -> StoreResult<Option<AccountRecord>> {
        self.exec
            .query(
                "SELECT id, email, pwhash, last_pw_change, likes, dislikes FROM accounts WHERE id = ?",
                vec![Value::from(id.0)],
                first_account,
            )
            .await
    }

    /// Every account, ordered by id
    pub async fn list(&self) -> StoreResult<Vec<AccountRecord>> {
        self.exec
            .query("SELECT id, email, pwhash, last_pw_change, likes, dislikes FROM accounts ORDER BY id", vec![], |rows| {
                let mut accounts = Vec::new();
                while let Some(row) = rows.next()? {
                    accounts.push(AccountRecord::from_row(row)?);
                }
                Ok(accounts)
            })
            .await
    }

    /// Insert a new account; `None` if the email is already taken
    pub async fn create(&self, email: &str, pwhash: &str) -> StoreResult<Option<AccountId>> {
        let id = self
            .exec
            .insert(
                "INSERT INTO accounts (email, pwhash, last_pw_change) VALUES (?, ?, 0)
                 ON CONFLICT(email) DO NOTHING",
                vec![Value::from(email.to_string()), Value::from(pwhash.to_string())],
            )
            .await?;
        Ok(id.map(AccountId))
    }

    /// Overwrite the vote history; false if the account does not exist
    pub async fn update_votes(&self, id: AccountId, votes: &VoteLists) -> StoreResult<bool> {
        let changed = self
            .exec
            .update(
                "UPDATE accounts SET likes = ?, dislikes = ? WHERE id = ?",
                vec![
                    Value::from(votes.likes.to_stored()),
                    Value::from(votes.dislikes.to_stored()),
                    Value::from(id.0),
                ],
            )
            .await?;
        Ok(changed > 0)
    }

    /// Replace the password hash, optionally moving the credential-change mark
    pub async fn set_password(
        &self,
        id: AccountId,
        pwhash: &str,
        changed_at: Option<Timestamp>,
    ) -> StoreResult<bool> {
        let changed = match changed_at {
            Some(at) => {
                self.exec
                    .update(
                        "UPDATE accounts SET pwhash = ?, last_pw_change = ? WHERE id = ?",
                        vec![
                            Value::from(pwhash.to_string()),
                            Value::from(at.as_millis()),
                            Value::from(id.0),
                        ],
                    )
                    .await?
            }
            None => {
                self.exec
                    .update(
                        "UPDATE accounts SET pwhash = ? WHERE id = ?",
                        vec![Value::from(pwhash.to_string()), Value::from(id.0)],
                    )
                    .await?
            }
        };
        Ok(changed > 0)
    }

    pub async fn delete(&self, id: AccountId) -> StoreResult<bool> {
        let changed = self
            .exec
            .update("DELETE FROM accounts WHERE id = ?", vec![Value::from(id.0)])
            .await?;
        Ok(changed > 0)
    }
}

fn first_account(rows: &mut rusqlite::Rows<'_>) -> rusqlite::Result<Option<AccountRecord>> {
    match rows.next()? {
        Some(row) => AccountRecord::from_row(row).map(Some),
        None => Ok(None),
    }
}
