//! Core error types for learnhub-core.
//!
//! Every fallible operation in the library returns [`CoreError`]. Storage
//! problems are split into a retryable [`CoreError::StorageUnavailable`]
//! (busy or locked database) and the non-retryable [`DatabaseError`] family.

use std::path::PathBuf;
use thiserror::Error;

use crate::catalog::{ToolCategory, UnlockCondition};

/// Core error type for learnhub-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Task id outside the module's `1..=max` range.
    #[error("Invalid task id {task_id} for module '{module_id}' (expected 1..={max})")]
    InvalidTaskId {
        module_id: String,
        task_id: u32,
        max: u32,
    },

    /// Module id absent from the catalog
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    /// Tool id absent from the catalog (or inactive)
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The user has not been granted this tool yet
    #[error("Tool '{tool_id}' is locked for this user")]
    ToolLocked { tool_id: String },

    /// A user with this email is already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    /// No user registered under this email or id
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// Transient storage failure; the operation is safe to retry.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog parsing or validation errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl CoreError {
    /// Whether the caller may retry the operation unchanged.
    ///
    /// Writes are single atomic statements or transactions, so a retry after
    /// a busy/locked database never double-applies anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::StorageUnavailable(_))
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked or busy
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Catalog parsing and validation errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid unlock condition '{0}' (expected 'module:<id>' or 'course:complete')")]
    InvalidCondition(String),

    #[error("Duplicate module id: {0}")]
    DuplicateModule(String),

    #[error("Duplicate tool id: {0}")]
    DuplicateTool(String),

    #[error("Module '{0}' has no tasks")]
    EmptyModule(String),

    #[error("Module '{module_id}' task ids must run 1..={expected_max}, found {found:?}")]
    TaskNumbering {
        module_id: String,
        expected_max: u32,
        found: Vec<u32>,
    },

    #[error("Tool '{tool_id}' unlocks on unknown module '{module_id}'")]
    DanglingTool { tool_id: String, module_id: String },

    #[error("Tool '{tool_id}' has category {category:?} but unlocks on '{unlock}'")]
    CategoryMismatch {
        tool_id: String,
        category: ToolCategory,
        unlock: UnlockCondition,
    },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
                ) =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<DatabaseError> for CoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Locked => {
                CoreError::StorageUnavailable("database is busy or locked".into())
            }
            other => CoreError::Database(other),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::from(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
