use thiserror::Error;

/// Application-wide error types.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    /// A unique index rejected the write (MongoDB error code 11000).
    #[error("{0}")]
    Duplicate(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too many requests: {0}")]
    RateLimited(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Helper conversion from anyhow::Error
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Returns `true` when the driver error is a unique-index violation.
///
/// Inserts and updates report it as a write error; `findAndModify`-style
/// commands report it as a command error.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

impl AppError {
    /// Map a driver error, turning duplicate-key failures into
    /// `Duplicate(<entity> with this <field> already exists)`.
    pub fn from_mongo(err: mongodb::error::Error, entity: &str, field: &str) -> Self {
        if is_duplicate_key(&err) {
            AppError::Duplicate(format!("{entity} with this {field} already exists"))
        } else {
            AppError::Database(err.to_string())
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            AppError::Duplicate("Record already exists".into())
        } else {
            AppError::Database(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_duplicate_message_verbatim() {
        let err = AppError::Duplicate("Blog post with this slug already exists".into());
        assert_eq!(err.to_string(), "Blog post with this slug already exists");
    }

    #[test]
    fn test_anyhow_maps_to_internal() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AppError::Internal(msg) if msg == "boom"));
    }
}
