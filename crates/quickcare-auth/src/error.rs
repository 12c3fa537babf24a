//! Authentication error types.

use axum::response::{IntoResponse, Response};
use quickcare_api::ApiError;
use quickcare_storage::StorageError;

/// Errors raised while hashing credentials, minting tokens or
/// authenticating a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` header on the request.
    #[error("Missing Authorization header")]
    MissingToken,

    /// The token failed signature or claims validation.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The token's `exp` claim is in the past.
    #[error("Token has expired")]
    TokenExpired,

    /// The token was valid but its subject no longer resolves to a user.
    #[error("Unknown user")]
    UnknownUser,

    /// The account behind the token has been deactivated.
    #[error("Account is deactivated")]
    AccountDeactivated,

    /// The authenticated user lacks the role the route requires.
    #[error("{0}")]
    Forbidden(String),

    /// Password hashing or verification failed.
    #[error("Password hash error: {0}")]
    Hash(String),

    /// The storage backend failed while loading the user.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::Hash(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken
            | AuthError::InvalidToken(_)
            | AuthError::TokenExpired
            | AuthError::UnknownUser => ApiError::unauthorized(err.to_string()),
            AuthError::AccountDeactivated => {
                ApiError::forbidden("Account is deactivated")
            }
            AuthError::Forbidden(message) => ApiError::forbidden(message),
            AuthError::Hash(message) => ApiError::internal(message),
            AuthError::Storage(err) => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_auth_errors_map_to_statuses() {
        let cases = [
            (AuthError::MissingToken, StatusCode::UNAUTHORIZED),
            (
                AuthError::invalid_token("bad signature"),
                StatusCode::UNAUTHORIZED,
            ),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (AuthError::UnknownUser, StatusCode::UNAUTHORIZED),
            (AuthError::AccountDeactivated, StatusCode::FORBIDDEN),
            (
                AuthError::forbidden("Admin access required"),
                StatusCode::FORBIDDEN,
            ),
            (
                AuthError::Hash("argon2 failure".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_internal_errors_do_not_leak_detail() {
        let err = AuthError::Hash("salt length invalid".into());
        let body = ApiError::from(err).to_body();
        assert_eq!(body.error.message, "Internal server error");
    }
}
