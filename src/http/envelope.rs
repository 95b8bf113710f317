//! The uniform HTTP envelope from spec §6: `{success, data?, error?: {code,
//! message, details?}}`, plus [`axum::response::IntoResponse`] for
//! [`CellarError`] so every handler can simply `?`-propagate and let this
//! module translate into the stable wire shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::{CellarError, ErrorCode};

#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Lets handlers return `Result<Json<T>, CellarError>` (via `?`) and have
/// the error side render as the §6 envelope automatically.
pub struct ApiError(pub CellarError);

impl From<CellarError> for ApiError {
    fn from(err: CellarError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = status_for(code);
        let details = match &self.0 {
            CellarError::InsufficientStock { requested, available } => {
                Some(serde_json::json!({ "requested": requested, "available": available }))
            }
            _ => None,
        };
        let body: ApiEnvelope<()> =
            ApiEnvelope { success: false, data: None, error: Some(ErrorBody { code, message: self.0.to_string(), details }) };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiEnvelope<T>>, ApiError>;

pub fn ok<T: Serialize>(data: T) -> Json<ApiEnvelope<T>> {
    Json(ApiEnvelope::ok(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError(CellarError::not_found("wine"));
        assert_eq!(status_for(err.0.code()), StatusCode::NOT_FOUND);
    }

    #[test]
    fn insufficient_stock_carries_structured_details() {
        let err = CellarError::InsufficientStock { requested: 5, available: 2 };
        assert_eq!(status_for(err.code()), StatusCode::CONFLICT);
    }
}
