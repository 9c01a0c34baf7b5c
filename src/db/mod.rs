pub mod sqlite;
pub mod repository;

pub use sqlite::*;
pub use repository::*;

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Illegal state transition: {0}")]
    Conflict(String),

    #[error("Stale aggregate version for emergency {id}: expected {expected}")]
    StaleVersion { id: String, expected: i64 },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

/// Acquire the shared connection, surfacing poisoning as an error instead
/// of panicking inside a request handler.
pub fn lock(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
    db.lock().map_err(|_| DatabaseError::LockPoisoned)
}
