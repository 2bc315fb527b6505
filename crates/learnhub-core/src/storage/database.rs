//! SQLite-backed storage for users, task progress, and tool unlocks.
//!
//! This layer knows nothing about the catalog: it stores whatever ids it is
//! handed. Validation against the catalog happens in
//! [`crate::progress::ProgressStore`] and [`crate::unlock::UnlockEngine`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{data_dir, migrations, Config};
use crate::error::{CoreError, DatabaseError, Result};

/// A registered learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Completed tasks of one user in one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub module_id: String,
    pub completed_task_ids: BTreeSet<u32>,
    pub last_accessed: DateTime<Utc>,
}

/// The one-time grant of a tool to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRecord {
    pub user_id: String,
    pub tool_id: String,
    pub granted_at: DateTime<Utc>,
    pub usage_count: u64,
}

/// SQLite database for learner state.
///
/// One `Database` wraps one connection. Concurrent callers each open their
/// own `Database` on the same file; correctness under concurrency comes from
/// the table constraints, not from sharing a handle.
pub struct Database {
    conn: Connection,
}

/// Default busy timeout for file-backed databases.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

fn row_to_unlock(row: &rusqlite::Row) -> rusqlite::Result<UnlockRecord> {
    let granted_at: String = row.get(2)?;
    Ok(UnlockRecord {
        user_id: row.get(0)?,
        tool_id: row.get(1)?,
        granted_at: parse_timestamp(2, &granted_at)?,
        usage_count: row.get(3)?,
    })
}

impl Database {
    /// Open the database named by `config`, defaulting to
    /// `<data dir>/learnhub.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let path = match &config.storage.database_path {
            Some(path) => path.clone(),
            None => data_dir()?.join("learnhub.db"),
        };
        Self::open_at(
            &path,
            Duration::from_millis(config.storage.busy_timeout_ms),
        )
    }

    /// Open (creating if needed) a database file at `path`.
    ///
    /// The file is switched to WAL so readers never block the writer, and a
    /// busy timeout is installed so that concurrent writers queue instead of
    /// failing immediately.
    pub fn open_at(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let open_failed = |source| {
            CoreError::Database(DatabaseError::OpenFailed {
                path: PathBuf::from(path),
                source,
            })
        };
        let conn = Connection::open(path).map_err(open_failed)?;
        conn.busy_timeout(busy_timeout).map_err(open_failed)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", true)?;
        migrations::migrate(&self.conn)
            .map_err(|e| match DatabaseError::from(e) {
                DatabaseError::Locked => DatabaseError::Locked,
                other => DatabaseError::MigrationFailed(other.to_string()),
            })?;
        Ok(())
    }

    // === Users ===

    /// Register a user. Emails are unique.
    ///
    /// # Errors
    /// [`CoreError::UserExists`] if the email is taken.
    pub fn create_user(&self, email: &str, name: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let inserted = self.conn.execute(
            "INSERT INTO users (id, email, name, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(email) DO NOTHING",
            params![user.id, user.email, user.name, user.created_at.to_rfc3339()],
        )?;
        if inserted == 0 {
            return Err(CoreError::UserExists(email.to_string()));
        }
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, created_at FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email, name, created_at FROM users ORDER BY created_at, email")?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    // === Progress ===

    /// Add `task_id` to the completed set of `(user_id, module_id)`.
    ///
    /// Creates the progress row on first use and bumps `last_accessed`.
    /// Returns `true` if the task was not already complete.
    pub fn insert_completed_task(
        &self,
        user_id: &str,
        module_id: &str,
        task_id: u32,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let at = at.to_rfc3339();
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        let result: rusqlite::Result<usize> = (|| {
            self.conn.execute(
                "INSERT INTO progress (user_id, module_id, created_at, last_accessed)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(user_id, module_id) DO UPDATE SET last_accessed = excluded.last_accessed",
                params![user_id, module_id, at],
            )?;
            self.conn.execute(
                "INSERT OR IGNORE INTO progress_tasks (user_id, module_id, task_id, completed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, module_id, task_id, at],
            )
        })();
        match result {
            Ok(inserted) => {
                if let Err(err) = self.conn.execute_batch("COMMIT;") {
                    let _ = self.conn.execute_batch("ROLLBACK;");
                    return Err(err.into());
                }
                Ok(inserted == 1)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err.into())
            }
        }
    }

    /// Load the progress record for one module, if the user ever started it.
    pub fn load_progress(&self, user_id: &str, module_id: &str) -> Result<Option<ProgressRecord>> {
        let last_accessed = self
            .conn
            .query_row(
                "SELECT last_accessed FROM progress WHERE user_id = ?1 AND module_id = ?2",
                params![user_id, module_id],
                |row| {
                    let raw: String = row.get(0)?;
                    parse_timestamp(0, &raw)
                },
            )
            .optional()?;
        let Some(last_accessed) = last_accessed else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT task_id FROM progress_tasks WHERE user_id = ?1 AND module_id = ?2",
        )?;
        let completed_task_ids = stmt
            .query_map(params![user_id, module_id], |row| row.get::<_, u32>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;

        Ok(Some(ProgressRecord {
            user_id: user_id.to_string(),
            module_id: module_id.to_string(),
            completed_task_ids,
            last_accessed,
        }))
    }

    /// Every progress record the user has, ordered by module id.
    pub fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT module_id FROM progress WHERE user_id = ?1 ORDER BY module_id",
        )?;
        let module_ids = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(module_ids.len());
        for module_id in module_ids {
            if let Some(record) = self.load_progress(user_id, &module_id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Every completed `(module_id, task_id)` pair of one user.
    pub fn completed_tasks(&self, user_id: &str) -> Result<Vec<(String, u32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT module_id, task_id FROM progress_tasks
             WHERE user_id = ?1
             ORDER BY module_id, task_id",
        )?;
        let tasks = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    // === Unlocks ===

    /// Atomically insert an unlock record unless one already exists.
    ///
    /// Returns whether this call created the row, together with the stored
    /// record. An existing record is returned untouched.
    pub fn insert_unlock_if_absent(
        &self,
        user_id: &str,
        tool_id: &str,
        granted_at: DateTime<Utc>,
    ) -> Result<(bool, UnlockRecord)> {
        let inserted = self.conn.execute(
            "INSERT INTO unlocks (user_id, tool_id, granted_at, usage_count)
             VALUES (?1, ?2, ?3, 0)
             ON CONFLICT(user_id, tool_id) DO NOTHING",
            params![user_id, tool_id, granted_at.to_rfc3339()],
        )?;
        let record = self.load_unlock(user_id, tool_id)?.ok_or_else(|| {
            DatabaseError::QueryFailed(format!(
                "unlock ({user_id}, {tool_id}) missing after insert"
            ))
        })?;
        Ok((inserted == 1, record))
    }

    pub fn load_unlock(&self, user_id: &str, tool_id: &str) -> Result<Option<UnlockRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT user_id, tool_id, granted_at, usage_count FROM unlocks
                 WHERE user_id = ?1 AND tool_id = ?2",
                params![user_id, tool_id],
                row_to_unlock,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_unlocks(&self, user_id: &str) -> Result<Vec<UnlockRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, tool_id, granted_at, usage_count FROM unlocks
             WHERE user_id = ?1
             ORDER BY id",
        )?;
        let records = stmt
            .query_map(params![user_id], row_to_unlock)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Bump the usage counter of an existing grant.
    ///
    /// Returns `None` when the user holds no grant for the tool.
    pub fn increment_usage(&self, user_id: &str, tool_id: &str) -> Result<Option<UnlockRecord>> {
        let updated = self.conn.execute(
            "UPDATE unlocks SET usage_count = usage_count + 1
             WHERE user_id = ?1 AND tool_id = ?2",
            params![user_id, tool_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        self.load_unlock(user_id, tool_id)
    }
}
