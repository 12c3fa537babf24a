use crate::role::Role;
use crate::time::now_utc;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Self-reported gender, kept as a closed set to match the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// A user account: identity, role, and profile.
///
/// Accounts are never hard-deleted; `active` is the soft-delete flag.
/// Deactivated accounts are excluded from default list queries and
/// cannot authenticate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2id PHC hash. Never serialized into API responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// Medical specialty. Required for doctors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    /// Medical license number. Required for doctors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(rename = "isActive")]
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Creates a new active user with generated ID and current timestamps.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = now_utc();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into().to_lowercase(),
            password_hash: password_hash.into(),
            role,
            phone: None,
            address: None,
            date_of_birth: None,
            gender: None,
            specialization: None,
            license_number: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes `updated_at` after a mutation.
    pub fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    /// Returns `true` if this account can appear in doctor listings
    /// and accept bookings.
    pub fn is_bookable_doctor(&self) -> bool {
        self.active && self.role.is_doctor()
    }
}
