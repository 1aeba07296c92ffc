//! Error types for the Tether core crate.

use thiserror::Error;

/// Top-level error type for all Tether operations.
#[derive(Debug, Error)]
pub enum TetherError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("not permitted: {0}")]
    Forbidden(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream provider error: {0}")]
    Provider(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// A convenience Result alias that defaults to [`TetherError`].
pub type Result<T> = std::result::Result<T, TetherError>;

impl TetherError {
    /// Classify a storage-driver error into the small internal taxonomy.
    ///
    /// Unique and foreign-key violations become [`TetherError::Conflict`];
    /// everything else stays a generic database error. Raw driver codes are
    /// never surfaced to callers.
    pub fn from_db(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    return TetherError::Conflict("a record with this value already exists".into());
                }
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    return TetherError::Conflict("referenced record does not exist".into());
                }
                _ => {}
            }
        }
        TetherError::Database(err)
    }
}
