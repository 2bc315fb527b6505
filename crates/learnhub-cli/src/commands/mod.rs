pub mod catalog;
pub mod config;
pub mod progress;
pub mod tools;
pub mod user;

use learnhub_core::{Catalog, Config, CoreError, Database, User};
use serde::Serialize;

/// Catalog and database named by the configuration.
pub fn open(config: &Config) -> Result<(Catalog, Database), CoreError> {
    let catalog = config.catalog()?;
    let db = Database::open(config)?;
    Ok((catalog, db))
}

/// Look a learner up by email.
pub fn require_user(db: &Database, email: &str) -> Result<User, CoreError> {
    db.find_user_by_email(email)?
        .ok_or_else(|| CoreError::UnknownUser(email.to_string()))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
