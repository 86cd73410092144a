use carelink_core::AppError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Maps a sqlx failure into the application error taxonomy.
pub(crate) fn map_sqlx_error(context: &str, error: sqlx::Error) -> AppError {
    match &error {
        sqlx::Error::Database(database_error) => match database_error.code().as_deref() {
            Some(UNIQUE_VIOLATION) => AppError::Conflict(format!("{context}: {error}")),
            Some(FOREIGN_KEY_VIOLATION) => {
                AppError::NotFound(format!("{context}: referenced row does not exist"))
            }
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                AppError::Transient(format!("{context}: {error}"))
            }
            _ => AppError::Internal(format!("{context}: {error}")),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AppError::Transient(format!("{context}: {error}"))
        }
        _ => AppError::Internal(format!("{context}: {error}")),
    }
}
