//! Authentication errors and their HTTP rendering

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Input failed validation
    #[error("{0}")]
    Validation(String),

    /// Signup with an email that is already registered
    #[error("User already exists")]
    UserExists,

    /// Wrong email or password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing, expired or revoked session
    #[error("Not authenticated")]
    Unauthorized,

    /// No user with the requested id
    #[error("User not found")]
    UserNotFound,

    /// Authenticated but not allowed
    #[error("Forbidden")]
    Forbidden,

    /// A provider token or OAuth state could not be verified
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Google sign-in has not been configured
    #[error("Google sign-in is not configured")]
    ProviderUnavailable,

    /// Too many attempts from one client
    #[error("Too many attempts, try again later")]
    RateLimited,

    /// Anything else; details are logged, not returned
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Internal(err.into())
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AuthError {
    fn from(rejection: PathRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AuthError {
    fn from(rejection: QueryRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::UserExists | AuthError::ProviderUnavailable => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidCredentials | AuthError::Unauthorized | AuthError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "Internal server error".to_string(),
            AuthError::InvalidToken(_) => "Invalid token".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(e) = &self {
            error!("Authentication failure: {:#}", e);
        }

        let body = Json(serde_json::json!({
            "error": self.public_message(),
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AuthError::UserExists.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AuthError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = AuthError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert_eq!(err.public_message(), "Internal server error");

        let err = AuthError::InvalidToken("aud mismatch".to_string());
        assert_eq!(err.public_message(), "Invalid token");

        assert_eq!(AuthError::UserExists.public_message(), "User already exists");
    }
}
