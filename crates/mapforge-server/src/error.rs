use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use mapforge_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::InvalidData(_)
            | AppError::InvalidGeoJson(_)
            | AppError::BBoxTooBig { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied
            | AppError::PrivateProject
            | AppError::HasMappedTasks => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SerializationError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            sub_code: self.0.sub_code().to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
