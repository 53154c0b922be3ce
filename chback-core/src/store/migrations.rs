//! Versioned schema migrations for the content and account stores
//!
//! Each store tracks the migrations it has applied in its own
//! `schema_version` table. Every migration runs in its own transaction.

use crate::model::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// Migrations for the content store (variation rosters)
pub fn content_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Variations with voter rosters",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS variations (
                id INTEGER PRIMARY KEY,
                value TEXT NOT NULL DEFAULT '',
                likes TEXT NOT NULL DEFAULT '',       -- ';'-joined account ids
                dislikes TEXT NOT NULL DEFAULT ''     -- ';'-joined account ids
            );
        "#,
    }]
}

/// Migrations for the account store (accounts and the invalidation ledger)
pub fn account_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Accounts with vote histories",
            up_sql: r#"
                CREATE TABLE IF NOT EXISTS accounts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    pwhash TEXT NOT NULL,
                    last_pw_change INTEGER NOT NULL DEFAULT 0,   -- epoch millis
                    likes TEXT NOT NULL DEFAULT '',              -- ';'-joined variation ids
                    dislikes TEXT NOT NULL DEFAULT ''            -- ';'-joined variation ids
                );
            "#,
        },
        Migration {
            version: 2,
            description: "Invalidated token ledger",
            up_sql: r#"
                CREATE TABLE IF NOT EXISTS invalid_tokens (
                    token TEXT PRIMARY KEY,
                    invalidated_at INTEGER NOT NULL
                );
            "#,
        },
    ]
}

fn ensure_version_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Highest applied version, 0 for a fresh database
pub fn current_version(conn: &Connection) -> rusqlite::Result<i32> {
    ensure_version_table(conn)?;

    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}

/// Apply every migration newer than the current version
pub fn apply(conn: &mut Connection, migrations: &[Migration]) -> rusqlite::Result<usize> {
    let current = current_version(conn)?;
    let mut applied = 0;

    for migration in migrations.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, Timestamp::now().as_millis()],
        )?;
        tx.commit()?;

        tracing::debug!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
        applied += 1;
    }

    Ok(applied)
}

/// Latest version a migration set brings a store to
pub fn latest_version(migrations: &[Migration]) -> i32 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}
