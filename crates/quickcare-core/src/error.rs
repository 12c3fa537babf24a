use thiserror::Error;

/// Core error types for Quickcare domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid slot time: {0}")]
    InvalidSlotTime(String),

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },
}

impl CoreError {
    /// Create a new InvalidRole error
    pub fn invalid_role(role: impl Into<String>) -> Self {
        Self::InvalidRole(role.into())
    }

    /// Create a new InvalidStatus error
    pub fn invalid_status(status: impl Into<String>) -> Self {
        Self::InvalidStatus(status.into())
    }

    /// Create a new InvalidSlotTime error
    pub fn invalid_slot_time(value: impl Into<String>) -> Self {
        Self::InvalidSlotTime(value.into())
    }

    /// Create a new InvalidField error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
