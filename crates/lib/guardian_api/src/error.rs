//! Application error types.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use guardian_core::auth::AuthError;
use guardian_core::complaints::ComplaintError;
use guardian_core::media::MediaError;
use guardian_core::store::StoreError;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Upstream(detail) => {
                error!("upstream failure: {detail}");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_failure",
                    "Upstream service failure",
                )
            }
            AppError::Internal(detail) => {
                error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Reference(msg) => AppError::Validation(msg),
            StoreError::DbError(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            // One message for both so responses do not reveal which emails exist.
            AuthError::NoSuchUser | AuthError::InvalidPassword => {
                AppError::Unauthorized("Invalid credentials".into())
            }
            AuthError::DuplicateEmail => AppError::Conflict("Email already registered".into()),
            AuthError::TokenError(msg) => {
                debug!("rejecting session token: {msg}");
                AppError::Unauthorized("Invalid or expired session".into())
            }
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Upstream(msg) => AppError::Upstream(msg),
            other @ (MediaError::InvalidType { .. } | MediaError::TooLarge { .. }) => {
                AppError::Validation(other.to_string())
            }
            MediaError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

impl From<ComplaintError> for AppError {
    fn from(e: ComplaintError) -> Self {
        match e {
            ComplaintError::Unauthenticated => {
                AppError::Unauthorized("Authentication required".into())
            }
            ComplaintError::Forbidden(msg) => AppError::Forbidden(msg),
            ComplaintError::Validation(msg) => AppError::Validation(msg),
            ComplaintError::NotFound(id) => AppError::NotFound(format!("Complaint {id} not found")),
            e @ ComplaintError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            ComplaintError::Store(e) => AppError::from(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failures_share_one_message() {
        let a = AppError::from(AuthError::NoSuchUser);
        let b = AppError::from(AuthError::InvalidPassword);
        assert_eq!(a.to_string(), b.to_string());
        assert!(matches!(a, AppError::Unauthorized(_)));
    }

    #[test]
    fn status_codes_follow_variant() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn token_errors_do_not_echo_decoder_detail() {
        let err = AppError::from(AuthError::TokenError("InvalidSignature".into()));
        assert!(matches!(&err, AppError::Unauthorized(m) if m == "Invalid or expired session"));
        assert!(!err.to_string().contains("InvalidSignature"));
    }

    #[test]
    fn oversize_media_is_a_client_error() {
        let err = AppError::from(MediaError::TooLarge {
            filename: "big.jpg".into(),
            size: 12,
            limit: 10,
        });
        assert!(matches!(err, AppError::Validation(m) if m.contains("big.jpg")));
    }
}
