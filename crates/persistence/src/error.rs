//! Mapping of sqlx failures onto the store port error.

use domain::StoreError;

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

pub fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::DuplicateKey(
                db.constraint()
                    .map(|constraint| format!("unique constraint {constraint} violated"))
                    .unwrap_or_else(|| db.message().to_string()),
            )
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}
