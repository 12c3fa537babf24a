//! JWT issuing and validation.
//!
//! Tokens are signed with HMAC-SHA256 using the configured application
//! secret. Claims carry enough identity for the HTTP layer to log and
//! authorize without a storage round trip, but the extractor still
//! reloads the user so deactivation takes effect immediately.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use quickcare_core::{Role, User};

use crate::error::AuthError;

/// Default access token lifetime in seconds (24 hours).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Claims carried by a Quickcare access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token was issued to.
    pub sub: Uuid,
    /// Display name at issue time.
    pub name: String,
    /// Email at issue time.
    pub email: String,
    /// Role at issue time.
    pub role: Role,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
}

/// Issues and validates HS256 access tokens.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl JwtService {
    /// Creates a service signing with `secret` and issuing tokens that
    /// live for `ttl_secs` seconds.
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Issues a token for `user`.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.ttl_secs as i64,
            jti: Uuid::new_v4(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::invalid_token(e.to_string()))
    }

    /// Validates `token` and returns its claims.
    ///
    /// Expiry is checked with zero leeway; an expired token maps to
    /// [`AuthError::TokenExpired`] rather than a generic validation
    /// failure so clients can distinguish re-login from a bad token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::invalid_token(e.to_string()),
            })
    }

    /// Token lifetime in seconds, surfaced in login responses.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User::new("Jane Roe", "jane@example.com", "hash", Role::Patient)
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let jwt = JwtService::new("test-secret-test-secret-test-secret", 3600);
        let user = sample_user();
        let token = jwt.issue(&user).unwrap();
        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.role, Role::Patient);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = JwtService::new("secret-a-secret-a-secret-a-secret-a", 3600);
        let verifier = JwtService::new("secret-b-secret-b-secret-b-secret-b", 3600);
        let token = issuer.issue(&sample_user()).unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token_maps_to_token_expired() {
        let secret = "test-secret-test-secret-test-secret";
        let jwt = JwtService::new(secret, 3600);
        let user = sample_user();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let stale = Claims {
            sub: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &stale,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(jwt.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let jwt = JwtService::new("test-secret-test-secret-test-secret", 3600);
        assert!(matches!(
            jwt.verify("not.a.token"),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
