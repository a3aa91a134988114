//! Database error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Turn a unique-constraint violation into [`DbError::Duplicate`].
    pub(crate) fn from_insert(err: sqlx::Error, what: impl FnOnce() -> String) -> Self {
        let unique = err
            .as_database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or(false);
        if unique {
            DbError::Duplicate(what())
        } else {
            DbError::Database(err)
        }
    }
}

impl From<DbError> for debile_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => debile_core::Error::NotFound(msg),
            DbError::Duplicate(msg) => debile_core::Error::AlreadyExists(msg),
            _ => debile_core::Error::Internal(err.to_string()),
        }
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;
