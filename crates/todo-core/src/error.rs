//! Error types for todo-core

use thiserror::Error;

use crate::todo::TodoId;

/// Result type alias for todo operations
pub type Result<T> = std::result::Result<T, TodoError>;

/// Result type alias for store adapter operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Main error type for todo operations
#[derive(Error, Debug)]
pub enum TodoError {
    /// Malformed input: missing or empty title, missing or empty tag
    #[error("{0}")]
    Validation(String),

    /// Unknown todo id
    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    /// The document store failed while committing a change
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TodoError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        TodoError::Validation(message.into())
    }
}

/// Document store errors, distinct from domain errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The underlying database rejected or failed an operation
    #[error("Database error: {0}")]
    Database(String),

    /// A document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store connection has already been closed
    #[error("Store connection is closed")]
    Closed,
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    /// Config file is not valid TOML for the expected shape
    #[error("Invalid config file: {0}")]
    Parse(String),

    /// Value is present but unusable
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_into_todo_error() {
        let err: TodoError = StoreError::Closed.into();
        assert!(matches!(err, TodoError::Store(StoreError::Closed)));
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = TodoError::validation("\"title\" is a required field");
        assert_eq!(err.to_string(), "\"title\" is a required field");
    }

    #[test]
    fn test_not_found_names_the_id() {
        let err = TodoError::NotFound(TodoId::Seq(7));
        assert_eq!(err.to_string(), "Todo not found: 7");
    }
}
