pub mod sessions;
pub mod sqlite;
pub mod store;

pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Duplicate {entity_type}")]
    Duplicate { entity_type: String },

    #[error("{0}")]
    Validation(String),

    #[error("Corrupt stored document: {0}")]
    CorruptDocument(String),

    #[error("Invalid filter field: {0}")]
    InvalidFilter(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot prepare database location: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::models::ValidationError> for DatabaseError {
    fn from(err: crate::models::ValidationError) -> Self {
        DatabaseError::Validation(err.0)
    }
}
