//! Storage traits for the Quickcare persistence layer.
//!
//! Backends must be thread-safe (`Send + Sync`). Handlers never enforce
//! cross-row invariants themselves; the traits own them:
//!
//! - email uniqueness lives in [`UserStore::create_user`] /
//!   [`UserStore::update_user`]
//! - the one-scheduled-appointment-per-slot invariant lives in
//!   [`AppointmentStore::create_appointment`] /
//!   [`AppointmentStore::update_appointment`] /
//!   [`AppointmentStore::set_appointment_status`], which must perform
//!   the conflict check and the write as a single atomic step.

use async_trait::async_trait;
use quickcare_core::{Appointment, AppointmentStatus, MedicalRecord, User};
use uuid::Uuid;

use crate::error::StorageError;
use crate::types::{AppointmentFilter, Page, PageParams, RecordFilter, UserFilter};

/// User account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DuplicateEmail` if the email is taken.
    async fn create_user(&self, user: User) -> Result<User, StorageError>;

    /// Reads a user by ID. Returns `None` if absent (including deactivated
    /// accounts; callers decide how to treat the `active` flag).
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StorageError>;

    /// Looks a user up by (case-insensitive) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Lists users matching `filter`, sorted by name, paginated.
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: &PageParams,
    ) -> Result<Page<User>, StorageError>;

    /// Lists all active doctors, sorted by name. Used by the booking flow.
    async fn list_doctors(&self) -> Result<Vec<User>, StorageError>;

    /// Replaces a user row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    /// Returns `StorageError::DuplicateEmail` if the new email belongs to
    /// another account.
    async fn update_user(&self, user: User) -> Result<User, StorageError>;

    /// Flips the soft-delete flag.
    async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User, StorageError>;
}

/// Appointment persistence.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Creates an appointment.
    ///
    /// The slot-conflict check and the insert are one atomic operation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::SlotTaken` if the appointment is `scheduled`
    /// and another scheduled appointment already holds the same
    /// (doctor, date, time) slot.
    async fn create_appointment(&self, appt: Appointment) -> Result<Appointment, StorageError>;

    /// Reads an appointment by ID.
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StorageError>;

    /// Lists appointments matching `filter`, sorted by (date, time)
    /// ascending, paginated.
    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: &PageParams,
    ) -> Result<Page<Appointment>, StorageError>;

    /// Replaces an appointment row, re-running the slot-conflict check
    /// (excluding the row itself) atomically with the write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if absent,
    /// `StorageError::SlotTaken` on a conflicting reschedule.
    async fn update_appointment(&self, appt: Appointment) -> Result<Appointment, StorageError>;

    /// Transitions the status only. A cancellation frees the slot; a
    /// transition back to a slot-blocking status re-runs the conflict
    /// check (excluding the row itself) atomically with the write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if absent,
    /// `StorageError::SlotTaken` if the slot has been rebooked since.
    async fn set_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StorageError>;

    /// Removes an appointment. This is a hard delete.
    async fn delete_appointment(&self, id: Uuid) -> Result<(), StorageError>;
}

/// Medical record persistence. Records are soft-deleted only.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_record(&self, record: MedicalRecord) -> Result<MedicalRecord, StorageError>;

    /// Reads a record by ID, including inactive ones.
    async fn get_record(&self, id: Uuid) -> Result<Option<MedicalRecord>, StorageError>;

    /// Lists active records matching `filter`, newest first, paginated.
    async fn list_records(
        &self,
        filter: &RecordFilter,
        page: &PageParams,
    ) -> Result<Page<MedicalRecord>, StorageError>;

    /// Replaces a record row.
    async fn update_record(&self, record: MedicalRecord) -> Result<MedicalRecord, StorageError>;

    /// Marks a record inactive. Idempotent.
    async fn soft_delete_record(&self, id: Uuid) -> Result<(), StorageError>;
}

// Ensure traits are object-safe by using them as trait objects
#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_user_store_object_safe(_: &dyn UserStore) {}
    fn _assert_appointment_store_object_safe(_: &dyn AppointmentStore) {}
    fn _assert_record_store_object_safe(_: &dyn RecordStore) {}
}
