//! Error types for session and component persistence.

use thiserror::Error;

/// Errors surfaced by the session and component stores.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying SQLite error.
    #[error("Database error: {0}")]
    Connection(#[from] rusqlite::Error),

    /// A session, component, interaction or dependency edge does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// What was looked up ("sessions", "components", "interaction", ...).
        entity: String,
        /// The identifier that missed.
        id: String,
    },

    /// A stored JSON column failed to serialize or deserialize.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An entity failed validation before being written.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// I/O error opening or writing the database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Builds a `NotFound` for the given entity kind and identifier.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound { entity: entity.into(), id: id.into() }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
