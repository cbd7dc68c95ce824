// HTTP API Error Types
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::recycle::RecycleError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // Recycle bin rejection, status chosen by kind
    Recycle(RecycleError),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Recycle(err) => match err {
                RecycleError::InvalidTable(_) => 400,
                RecycleError::EntryNotFound(_) | RecycleError::RecordNotFound { .. } => 404,
                RecycleError::AlreadyRestored(_)
                | RecycleError::IdCollision { .. }
                | RecycleError::ConcurrentRestoreDetected(_) => 409,
                RecycleError::CorruptSnapshot(_) => 422,
                RecycleError::RestoreWriteFailed(_) => 500,
                RecycleError::PersistenceError(_) => 503,
            },
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            // Storage internals stay in the logs
            ApiError::Recycle(RecycleError::PersistenceError(_)) => {
                "Recycle bin storage is temporarily unavailable".to_string()
            }
            ApiError::Recycle(RecycleError::RestoreWriteFailed(_)) => {
                "Failed to restore record".to_string()
            }
            ApiError::Recycle(err) => err.to_string(),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Recycle(err) => err.kind(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<RecycleError> for ApiError {
    fn from(err: RecycleError) -> Self {
        match &err {
            RecycleError::PersistenceError(msg) => tracing::error!("Recycle storage error: {}", msg),
            RecycleError::RestoreWriteFailed(msg) => tracing::error!("Restore write failed: {}", msg),
            _ => {}
        }
        ApiError::Recycle(err)
    }
}

// Extractor rejections get the same JSON error body as everything else
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_recycle_errors_to_statuses() {
        let cases = [
            (RecycleError::InvalidTable("x".into()), 400, "INVALID_TABLE"),
            (RecycleError::EntryNotFound(1), 404, "ENTRY_NOT_FOUND"),
            (RecycleError::AlreadyRestored(1), 409, "ALREADY_RESTORED"),
            (RecycleError::IdCollision { table: "t".into(), id: 1 }, 409, "ID_COLLISION"),
            (RecycleError::ConcurrentRestoreDetected(1), 409, "CONCURRENT_RESTORE_DETECTED"),
            (RecycleError::CorruptSnapshot("x".into()), 422, "CORRUPT_SNAPSHOT"),
            (RecycleError::RestoreWriteFailed("x".into()), 500, "RESTORE_WRITE_FAILED"),
            (RecycleError::PersistenceError("x".into()), 503, "PERSISTENCE_ERROR"),
        ];
        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.error_code(), code);
        }
    }

    #[test]
    fn hides_storage_details() {
        let api: ApiError = RecycleError::PersistenceError("password authentication failed".into()).into();
        assert!(!api.message().contains("password"));
        assert_eq!(api.to_json()["code"], "PERSISTENCE_ERROR");
    }
}
