use quickcare_core::SlotTime;
use thiserror::Error;
use time::Date;
use uuid::Uuid;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Slot already booked: doctor {doctor_id} on {date} at {time}")]
    SlotTaken {
        doctor_id: Uuid,
        date: Date,
        time: SlotTime,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn duplicate_email(email: impl Into<String>) -> Self {
        Self::DuplicateEmail(email.into())
    }

    pub fn slot_taken(doctor_id: Uuid, date: Date, time: SlotTime) -> Self {
        Self::SlotTaken {
            doctor_id,
            date,
            time,
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Returns `true` for errors caused by the request rather than the backend.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::DuplicateEmail(_) | Self::SlotTaken { .. })
    }
}

/// Convenience result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let id = Uuid::nil();
        let err = StorageError::not_found("Appointment", id);
        assert_eq!(
            err.to_string(),
            format!("Appointment not found: {id}")
        );

        let err = StorageError::duplicate_email("jane@example.com");
        assert!(err.is_conflict());

        let err = StorageError::backend("disk full");
        assert!(!err.is_conflict());
    }
}
