//! Pooled SQLite query executor
//!
//! One [`SqlExecutor`] exists per logical store. Each call checks a
//! connection out of the pool on a blocking worker thread and returns it
//! when the call completes, so no connection is ever shared between
//! concurrent operations. Two executors never share a transaction.

use super::migrations::{self, Migration};
use super::{StoreError, StoreResult};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Rows};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Executes parameterized reads and writes against one store
#[derive(Clone)]
pub struct SqlExecutor {
    pool: Arc<Pool<SqliteConnectionManager>>,
    name: &'static str,
}

impl SqlExecutor {
    /// Open a file-backed store
    ///
    /// # Arguments
    /// * `name` - Store label used in logs ("content", "account")
    /// * `db_path` - Path to the SQLite database file
    /// * `pool_size` - Maximum number of pooled connections
    /// * `connection_timeout` - How long to wait for a free connection
    pub fn open<P: AsRef<Path>>(
        name: &'static str,
        db_path: P,
        pool_size: u32,
        connection_timeout: Duration,
    ) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = WAL; PRAGMA busy_timeout = {};",
                BUSY_TIMEOUT_MS
            ))
        });

        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(connection_timeout)
            .build(manager)?;

        tracing::debug!(store = name, pool_size, "Opened store");

        Ok(Self {
            pool: Arc::new(pool),
            name,
        })
    }

    /// Open an in-memory store
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn memory(name: &'static str) -> StoreResult<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(SqliteConnectionManager::memory())?;

        Ok(Self {
            pool: Arc::new(pool),
            name,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run a read and hand the row cursor to `handler`
    pub async fn query<R, F>(&self, sql: &'static str, params: Vec<Value>, handler: F) -> StoreResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Rows<'_>) -> rusqlite::Result<R> + Send + 'static,
    {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let mut rows = stmt.query(params_from_iter(params))?;
            handler(&mut rows)
        })
        .await
    }

    /// Run a write, returning the number of affected rows
    pub async fn update(&self, sql: &'static str, params: Vec<Value>) -> StoreResult<usize> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            stmt.execute(params_from_iter(params))
        })
        .await
    }

    /// Run an insert, returning the new rowid, or `None` if nothing was inserted
    pub async fn insert(&self, sql: &'static str, params: Vec<Value>) -> StoreResult<Option<i64>> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let changed = stmt.execute(params_from_iter(params))?;
            Ok((changed > 0).then(|| conn.last_insert_rowid()))
        })
        .await
    }

    /// Liveness probe
    pub async fn ping(&self) -> StoreResult<()> {
        self.with_connection(|conn| conn.query_row("SELECT 1", [], |_| Ok(())))
            .await
    }

    /// Apply pending migrations, returning how many ran
    pub fn migrate(&self, migrations: &[Migration]) -> StoreResult<usize> {
        let mut conn = self.pool.get()?;
        let applied = migrations::apply(&mut conn, migrations)?;
        if applied > 0 {
            tracing::info!(store = self.name, applied, "Applied store migrations");
        }
        Ok(applied)
    }

    /// Current schema version
    pub fn schema_version(&self) -> StoreResult<i32> {
        let conn = self.pool.get()?;
        Ok(migrations::current_version(&conn)?)
    }

    /// Run raw SQL, for fixtures and administrative tooling
    pub async fn execute_batch(&self, sql: impl Into<String>) -> StoreResult<()> {
        let sql = sql.into();
        self.with_connection(move |conn| conn.execute_batch(&sql)).await
    }

    async fn with_connection<R, F>(&self, f: F) -> StoreResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<R> + Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || -> StoreResult<R> {
            let mut conn = pool.get()?;
            Ok(f(&mut *conn)?)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

impl std::fmt::Debug for SqlExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlExecutor")
            .field("name", &self.name)
            .field("state", &self.pool.state())
            .finish()
    }
}
