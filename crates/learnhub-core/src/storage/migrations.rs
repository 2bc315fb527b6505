//! Database schema migrations for learnhub.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult, Transaction, TransactionBehavior};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// Runs inside a single `IMMEDIATE` transaction so that several processes
/// opening a fresh database file at once apply each step exactly once.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    create_schema_version_table(&tx)?;
    let current_version = get_schema_version(&tx);

    if current_version < 1 {
        migrate_v1(&tx)?;
    }
    if current_version < 2 {
        migrate_v2(&tx)?;
    }
    if current_version < SCHEMA_VERSION {
        set_schema_version(&tx, SCHEMA_VERSION)?;
    }

    tx.commit()
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users and per-module task progress.
///
/// Completed tasks live one row per `(user, module, task)` so that recording
/// a completion is a plain insert-or-ignore and the set never shrinks.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS progress (
            user_id        TEXT NOT NULL,
            module_id      TEXT NOT NULL,
            created_at     TEXT NOT NULL,
            last_accessed  TEXT NOT NULL,
            PRIMARY KEY (user_id, module_id)
        );

        CREATE TABLE IF NOT EXISTS progress_tasks (
            user_id       TEXT NOT NULL,
            module_id     TEXT NOT NULL,
            task_id       INTEGER NOT NULL CHECK (task_id > 0),
            completed_at  TEXT NOT NULL,
            PRIMARY KEY (user_id, module_id, task_id),
            FOREIGN KEY (user_id, module_id) REFERENCES progress(user_id, module_id)
        );",
    )
}

/// Migration v2: tool unlock grants.
///
/// The `(user_id, tool_id)` uniqueness constraint is what makes a grant
/// happen at most once, including under concurrent writers.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS unlocks (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      TEXT NOT NULL,
            tool_id      TEXT NOT NULL,
            granted_at   TEXT NOT NULL,
            usage_count  INTEGER NOT NULL DEFAULT 0 CHECK (usage_count >= 0),
            UNIQUE (user_id, tool_id)
        );

        CREATE INDEX IF NOT EXISTS idx_unlocks_user ON unlocks(user_id);",
    )
}
