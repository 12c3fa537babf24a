//! Axum extractors for authenticated routes.
//!
//! [`AuthUser`] validates the Bearer token and reloads the user from
//! storage, so a deactivated account is locked out as soon as the flag
//! flips, not when its token expires. [`AdminUser`] layers a role check
//! on top.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use quickcare_core::User;
use quickcare_storage::UserStore;

use crate::error::AuthError;
use crate::token::JwtService;

/// State the auth extractors pull out of the application state.
#[derive(Clone)]
pub struct AuthState {
    /// Token validation service.
    pub jwt: Arc<JwtService>,
    /// User storage for reloading the token subject.
    pub users: Arc<dyn UserStore>,
}

impl AuthState {
    pub fn new(jwt: Arc<JwtService>, users: Arc<dyn UserStore>) -> Self {
        Self { jwt, users }
    }
}

/// Extractor yielding the authenticated, active user behind the request.
#[derive(Debug)]
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = auth.jwt.verify(token).map_err(|err| {
            tracing::debug!(error = %err, "Rejected bearer token");
            err
        })?;

        let user = load_subject(&auth, claims.sub).await?;
        if !user.active {
            tracing::debug!(user_id = %user.id, "Deactivated account presented a valid token");
            return Err(AuthError::AccountDeactivated);
        }

        Ok(AuthUser(user))
    }
}

/// Extractor for admin-only routes.
#[derive(Debug)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            tracing::debug!(user_id = %user.id, role = %user.role, "Admin route denied");
            return Err(AuthError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

async fn load_subject(auth: &AuthState, id: Uuid) -> Result<User, AuthError> {
    auth.users
        .get_user(id)
        .await?
        .ok_or(AuthError::UnknownUser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use quickcare_core::Role;
    use quickcare_db_memory::MemoryStorage;

    async fn state_with_user(user: User) -> AuthState {
        let storage = Arc::new(MemoryStorage::new());
        storage.create_user(user).await.unwrap();
        AuthState::new(
            Arc::new(JwtService::new("extract-test-secret-extract-test", 3600)),
            storage,
        )
    }

    fn parts_with_bearer(token: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn test_valid_token_yields_user() {
        let user = User::new("Jane Roe", "jane@example.com", "hash", Role::Patient);
        let state = state_with_user(user.clone()).await;
        let token = state.jwt.issue(&user).unwrap();

        let mut parts = parts_with_bearer(&token);
        let AuthUser(got) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(got.id, user.id);
    }

    #[tokio::test]
    async fn test_missing_header_is_rejected() {
        let user = User::new("Jane Roe", "jane@example.com", "hash", Role::Patient);
        let state = state_with_user(user).await;

        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn test_deactivated_account_is_rejected() {
        let mut user = User::new("Jane Roe", "jane@example.com", "hash", Role::Patient);
        user.active = false;
        let state = state_with_user(user.clone()).await;
        let token = state.jwt.issue(&user).unwrap();

        let mut parts = parts_with_bearer(&token);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_is_rejected() {
        let ghost = User::new("Ghost", "ghost@example.com", "hash", Role::Patient);
        let state = state_with_user(User::new(
            "Jane Roe",
            "jane@example.com",
            "hash",
            Role::Patient,
        ))
        .await;
        let token = state.jwt.issue(&ghost).unwrap();

        let mut parts = parts_with_bearer(&token);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownUser));
    }

    #[tokio::test]
    async fn test_admin_extractor_enforces_role() {
        let patient = User::new("Jane Roe", "jane@example.com", "hash", Role::Patient);
        let state = state_with_user(patient.clone()).await;
        let token = state.jwt.issue(&patient).unwrap();

        let mut parts = parts_with_bearer(&token);
        let err = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));

        let admin = User::new("Root", "root@example.com", "hash", Role::Admin);
        let state = state_with_user(admin.clone()).await;
        let token = state.jwt.issue(&admin).unwrap();

        let mut parts = parts_with_bearer(&token);
        let AdminUser(got) = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(got.id, admin.id);
    }
}
