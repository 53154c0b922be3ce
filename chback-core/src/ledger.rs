//! Invalidation ledger
//!
//! Append-only record of revoked token strings, kept in the account store.
//! A token present here is void forever, whatever its signature or expiry
//! say. Entries are deduplicated and never pruned.

use crate::model::Timestamp;
use crate::store::{SqlExecutor, StoreResult};
use rusqlite::types::Value;

#[derive(Clone, Debug)]
pub struct InvalidationLedger {
    exec: SqlExecutor,
}

impl InvalidationLedger {
    /// Ledger over the account store's `invalid_tokens` table
    pub fn new(exec: SqlExecutor) -> Self {
        Self { exec }
    }

    /// Record `token` as revoked; appending a known token is a no-op
    pub async fn append(&self, token: &str) -> StoreResult<()> {
        self.exec
            .update(
                "INSERT OR IGNORE INTO invalid_tokens (token, invalidated_at) VALUES (?, ?)",
                vec![
                    Value::from(token.to_string()),
                    Value::from(Timestamp::now().as_millis()),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn contains(&self, token: &str) -> StoreResult<bool> {
        self.exec
            .query(
                "SELECT 1 FROM invalid_tokens WHERE token = ?",
                vec![Value::from(token.to_string())],
                |rows| Ok(rows.next()?.is_some()),
            )
            .await
    }

    pub async fn len(&self) -> StoreResult<u64> {
        self.exec
            .query("SELECT COUNT(*) FROM invalid_tokens", vec![], |rows| match rows.next()? {
                Some(row) => Ok(row.get::<_, i64>(0)? as u64),
                None => Ok(0),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::migrations;

    fn ledger() -> InvalidationLedger {
        let exec = SqlExecutor::memory("account").unwrap();
        exec.migrate(&migrations::account_migrations()).unwrap();
        InvalidationLedger::new(exec)
    }

    #[tokio::test]
    async fn test_append_and_contains() {
        let ledger = ledger();
        assert!(!ledger.contains("abc").await.unwrap());

        ledger.append("abc").await.unwrap();
        assert!(ledger.contains("abc").await.unwrap());
        assert!(!ledger.contains("abd").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_is_deduplicated() {
        let ledger = ledger();
        ledger.append("abc").await.unwrap();
        ledger.append("abc").await.unwrap();
        ledger.append("xyz").await.unwrap();
        assert_eq!(ledger.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_table_is_an_error() {
        let ledger = InvalidationLedger::new(SqlExecutor::memory("account").unwrap());
        assert!(ledger.contains("abc").await.is_err());
    }
}
