use thiserror::Error;

/// Application-wide error types for mapforge.
///
/// Every variant maps to an HTTP status and a stable `SubCode` string
/// that API clients match on (`{"Error": …, "SubCode": …}` bodies).
#[derive(Error, Debug)]
pub enum AppError {
    /// Request payload or query parameters failed validation.
    #[error("{0}")]
    InvalidData(String),

    /// A GeoJSON document could not be parsed or is geometrically invalid.
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    /// Bounding-box search area exceeds the allowed maximum.
    #[error("Bounding box area {area:.2} sq deg exceeds the maximum of {max:.2} sq deg")]
    BBoxTooBig { area: f64, max: f64 },

    /// Missing or invalid authentication token.
    #[error("Missing or invalid authentication token")]
    Unauthorized,

    /// Caller is not permitted to administer the project.
    #[error("User is not a manager of the project")]
    PermissionDenied,

    /// Caller may not view a private project.
    #[error("User not permitted: Private Project")]
    PrivateProject,

    /// Project has mapped or validated tasks and cannot be deleted.
    #[error("Project has mapped tasks and cannot be deleted")]
    HasMappedTasks,

    /// Entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Stable machine-readable code carried in the error response body.
    pub fn sub_code(&self) -> &'static str {
        match self {
            AppError::InvalidData(_) => "InvalidData",
            AppError::InvalidGeoJson(_) => "InvalidGeoJson",
            AppError::BBoxTooBig { .. } => "BBoxTooBig",
            AppError::Unauthorized => "InvalidToken",
            AppError::PermissionDenied => "UserPermissionError",
            AppError::PrivateProject => "PrivateProject",
            AppError::HasMappedTasks => "HasMappedTasks",
            AppError::NotFound(_) => "NotFound",
            AppError::SerializationError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_) => "InternalServerError",
        }
    }

    /// Returns true if the error is the caller's fault (4xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AppError::SerializationError(_)
                | AppError::DatabaseError(_)
                | AppError::ConfigError(_)
        )
    }
}
