//! Authentication for the Quickcare server.
//!
//! Covers the three concerns the HTTP layer leans on:
//!
//! - Argon2id password hashing ([`password`])
//! - HS256 JWT issuing and validation ([`token`])
//! - Axum extractors that turn a Bearer token into a loaded, active
//!   [`quickcare_core::User`] ([`extract`])

pub mod error;
pub mod extract;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use extract::{AdminUser, AuthState, AuthUser};
pub use token::{Claims, JwtService};
