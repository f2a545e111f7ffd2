use std::time::Duration;
use thiserror::Error;

/// Failure reported by a database service or by an operation run against it.
///
/// Collaborators classify their own failures into this taxonomy so the
/// coordinator never has to inspect raw error text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// The engine is missing an expected structural element (table, store, column).
    #[error("{0}")]
    SchemaMismatch(String),
    #[error("database initialization timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Classify a bare error message.
    ///
    /// Adapters that cannot supply a structured code fall back to this
    /// substring heuristic: messages mentioning `"object store"` or
    /// `"not found"` are treated as schema mismatches. It is case-sensitive
    /// and can misfire on unrelated messages.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("object store") || message.contains("not found") {
            DbError::SchemaMismatch(message)
        } else {
            DbError::Other(message)
        }
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, DbError::SchemaMismatch(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                if message.contains("no such table") || message.contains("no such column") {
                    DbError::SchemaMismatch(message.to_string())
                } else {
                    DbError::Other(err.to_string())
                }
            }
            _ => DbError::Other(err.to_string()),
        }
    }
}
