//! Custom error types for the API service

use auth::AuthError;
use axum::{
    Json,
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use media::MediaError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unauthorized access
    #[error("Unauthorized")]
    Unauthorized,

    /// Signed in without the required role
    #[error("Forbidden")]
    Forbidden,

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    /// Missing resource, message names it
    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests")]
    TooManyRequests,

    /// A feature whose provider is not configured
    #[error("{0} is not configured")]
    Unavailable(&'static str),

    /// The media provider failed
    #[error("Media provider error: {0}")]
    Media(#[source] MediaError),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Media(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalServerError | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Request failed: {:#}", err);
        ApiError::InternalServerError
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(common::error::DatabaseError::Query(err))
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::InvalidUrl(_) | MediaError::EmptyUpload => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Media(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized | AuthError::InvalidCredentials | AuthError::InvalidToken(_) => {
                ApiError::Unauthorized
            }
            AuthError::Forbidden => ApiError::Forbidden,
            AuthError::RateLimited => ApiError::TooManyRequests,
            AuthError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AuthError::Internal(e) => e.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

macro_rules! rejection_is_bad_request {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    ApiError::BadRequest(rejection.body_text())
                }
            }
        )+
    };
}

rejection_is_bad_request!(JsonRejection, PathRejection, QueryRejection, MultipartRejection);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            ApiError::Media(e) => {
                error!("{}", e);
                "Media provider error".to_string()
            }
            ApiError::Database(e) => {
                error!("{}", e);
                "Database error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_keep_their_status() {
        assert_eq!(ApiError::from(AuthError::Unauthorized).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(AuthError::RateLimited).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(AuthError::Validation("Name is required".to_string())).to_string(),
            "Name is required"
        );
    }

    #[test]
    fn media_errors_split_between_client_and_provider() {
        let bad_url = ApiError::from(MediaError::InvalidUrl("x".to_string()));
        assert_eq!(bad_url.status(), StatusCode::BAD_REQUEST);

        let rejected = ApiError::from(MediaError::Rejected {
            status: 401,
            message: "Invalid Signature".to_string(),
        });
        assert_eq!(rejected.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_errors_collapse_to_500() {
        let err = ApiError::from(anyhow::anyhow!("pool closed"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
