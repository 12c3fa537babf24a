use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access role attached to every user account.
///
/// Roles gate both route access and the implicit filtering applied to
/// list queries (patients see their own data, doctors theirs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn is_doctor(&self) -> bool {
        matches!(self, Self::Doctor)
    }

    pub fn is_patient(&self) -> bool {
        matches!(self, Self::Patient)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Doctor => "doctor",
            Self::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Self::Admin),
            "doctor" => Ok(Self::Doctor),
            "patient" => Ok(Self::Patient),
            other => Err(CoreError::invalid_role(other)),
        }
    }
}
