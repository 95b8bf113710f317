//! Crate-wide error taxonomy.
//!
//! Every subsystem defines its own error enum and converts into
//! [`CellarError`] so callers at the edge (the HTTP collaborator, the agent
//! dispatcher) only ever need to match on one type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CellarError>;

/// Stable error codes matching the envelope in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    AuthenticationError,
    AuthorizationError,
    NotFound,
    ConflictError,
    UnprocessableEntity,
    AiNotConfigured,
    ServiceUnavailable,
    DatabaseError,
    InternalServerError,
}

impl ErrorCode {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::ValidationError => 400,
            ErrorCode::AuthenticationError => 401,
            ErrorCode::AuthorizationError => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::ConflictError => 409,
            ErrorCode::UnprocessableEntity => 422,
            ErrorCode::AiNotConfigured => 503,
            ErrorCode::ServiceUnavailable => 503,
            ErrorCode::DatabaseError => 500,
            ErrorCode::InternalServerError => 500,
        }
    }
}

#[derive(Error, Debug)]
pub enum CellarError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authorization error: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unprocessable entity: {0}")]
    Unprocessable(String),

    #[error("AI provider not configured: {0}")]
    AiNotConfigured(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation canceled")]
    Canceled,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },
}

impl CellarError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        CellarError::Validation(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        CellarError::Internal(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        CellarError::NotFound(msg.into())
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        CellarError::Conflict(msg.into())
    }

    pub fn authorization<S: Into<String>>(msg: S) -> Self {
        CellarError::Authorization(msg.into())
    }

    pub fn unprocessable<S: Into<String>>(msg: S) -> Self {
        CellarError::Unprocessable(msg.into())
    }

    /// Maps this error onto the stable envelope code from spec §6.
    pub fn code(&self) -> ErrorCode {
        match self {
            CellarError::Validation(_) => ErrorCode::ValidationError,
            CellarError::Authorization(_) => ErrorCode::AuthorizationError,
            CellarError::NotFound(_) => ErrorCode::NotFound,
            CellarError::Conflict(_) => ErrorCode::ConflictError,
            CellarError::InsufficientStock { .. } => ErrorCode::ConflictError,
            CellarError::Unprocessable(_) => ErrorCode::UnprocessableEntity,
            CellarError::AiNotConfigured(_) => ErrorCode::AiNotConfigured,
            CellarError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
            CellarError::Database(_) => ErrorCode::DatabaseError,
            CellarError::Serialization(_) => ErrorCode::InternalServerError,
            CellarError::Internal(_) => ErrorCode::InternalServerError,
            CellarError::Canceled => ErrorCode::InternalServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_maps_to_conflict() {
        let err = CellarError::InsufficientStock {
            requested: 8,
            available: 6,
        };
        assert_eq!(err.code(), ErrorCode::ConflictError);
        assert_eq!(err.code().http_status(), 409);
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(CellarError::validation("bad").code().http_status(), 400);
    }
}
