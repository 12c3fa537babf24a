use std::collections::HashMap;

use async_trait::async_trait;
use quickcare_core::{Appointment, AppointmentStatus, MedicalRecord, User};
use quickcare_storage::{
    AppointmentFilter, AppointmentStore, Page, PageParams, RecordFilter, RecordStore,
    StorageError, UserFilter, UserStore,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::query::{appointment_matches, paginate, record_matches, user_matches};

/// In-memory storage backend.
///
/// Each entity lives in its own `RwLock`-guarded map. Invariant-bearing
/// writes (email uniqueness, slot conflicts) hold the write lock across
/// the check and the mutation, so concurrent requests cannot race past
/// the check.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    users: RwLock<HashMap<Uuid, User>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    records: RwLock<HashMap<Uuid, MedicalRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn create_user(&self, user: User) -> Result<User, StorageError> {
        let mut guard = self.users.write().await;
        let email = user.email.to_lowercase();
        if guard.values().any(|u| u.email == email) {
            return Err(StorageError::duplicate_email(email));
        }
        guard.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: &PageParams,
    ) -> Result<Page<User>, StorageError> {
        let guard = self.users.read().await;
        let mut matches: Vec<User> = guard
            .values()
            .filter(|u| user_matches(u, filter))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paginate(matches, page))
    }

    async fn list_doctors(&self) -> Result<Vec<User>, StorageError> {
        let guard = self.users.read().await;
        let mut doctors: Vec<User> = guard
            .values()
            .filter(|u| u.is_bookable_doctor())
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn update_user(&self, user: User) -> Result<User, StorageError> {
        let mut guard = self.users.write().await;
        if !guard.contains_key(&user.id) {
            return Err(StorageError::not_found("User", user.id));
        }
        let email = user.email.to_lowercase();
        if guard.values().any(|u| u.id != user.id && u.email == email) {
            return Err(StorageError::duplicate_email(email));
        }
        guard.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User, StorageError> {
        let mut guard = self.users.write().await;
        let user = guard
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("User", id))?;
        user.active = active;
        user.touch();
        Ok(user.clone())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStorage {
    async fn create_appointment(&self, appt: Appointment) -> Result<Appointment, StorageError> {
        let mut guard = self.appointments.write().await;
        if appt.status.blocks_slot()
            && guard
                .values()
                .any(|a| a.occupies(appt.doctor_id, appt.date, &appt.time))
        {
            return Err(StorageError::slot_taken(
                appt.doctor_id,
                appt.date,
                appt.time.clone(),
            ));
        }
        guard.insert(appt.id, appt.clone());
        Ok(appt)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StorageError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: &PageParams,
    ) -> Result<Page<Appointment>, StorageError> {
        let guard = self.appointments.read().await;
        let mut matches: Vec<Appointment> = guard
            .values()
            .filter(|a| appointment_matches(a, filter))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.time.cmp(&b.time))
                .then(a.id.cmp(&b.id))
        });
        Ok(paginate(matches, page))
    }

    async fn update_appointment(&self, appt: Appointment) -> Result<Appointment, StorageError> {
        let mut guard = self.appointments.write().await;
        if !guard.contains_key(&appt.id) {
            return Err(StorageError::not_found("Appointment", appt.id));
        }
        if appt.status.blocks_slot()
            && guard
                .values()
                .any(|a| a.id != appt.id && a.occupies(appt.doctor_id, appt.date, &appt.time))
        {
            return Err(StorageError::slot_taken(
                appt.doctor_id,
                appt.date,
                appt.time.clone(),
            ));
        }
        guard.insert(appt.id, appt.clone());
        Ok(appt)
    }

    async fn set_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StorageError> {
        let mut guard = self.appointments.write().await;
        let (doctor_id, date, time) = {
            let current = guard
                .get(&id)
                .ok_or_else(|| StorageError::not_found("Appointment", id))?;
            (current.doctor_id, current.date, current.time.clone())
        };
        if status.blocks_slot()
            && guard
                .values()
                .any(|a| a.id != id && a.occupies(doctor_id, date, &time))
        {
            return Err(StorageError::slot_taken(doctor_id, date, time));
        }
        let appt = guard
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Appointment", id))?;
        appt.status = status;
        appt.touch();
        Ok(appt.clone())
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StorageError> {
        let mut guard = self.appointments.write().await;
        guard
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("Appointment", id))
    }
}

#[async_trait]
impl RecordStore for MemoryStorage {
    async fn create_record(&self, record: MedicalRecord) -> Result<MedicalRecord, StorageError> {
        let mut guard = self.records.write().await;
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<MedicalRecord>, StorageError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_records(
        &self,
        filter: &RecordFilter,
        page: &PageParams,
    ) -> Result<Page<MedicalRecord>, StorageError> {
        let guard = self.records.read().await;
        let mut matches: Vec<MedicalRecord> = guard
            .values()
            .filter(|r| record_matches(r, filter))
            .cloned()
            .collect();
        // Newest first
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(matches, page))
    }

    async fn update_record(&self, record: MedicalRecord) -> Result<MedicalRecord, StorageError> {
        let mut guard = self.records.write().await;
        if !guard.contains_key(&record.id) {
            return Err(StorageError::not_found("Record", record.id));
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    async fn soft_delete_record(&self, id: Uuid) -> Result<(), StorageError> {
        let mut guard = self.records.write().await;
        let record = guard
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Record", id))?;
        record.active = false;
        record.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcare_core::{Role, SlotTime};
    use time::macros::date;

    fn slot(s: &str) -> SlotTime {
        s.parse().unwrap()
    }

    async fn seed_doctor(store: &MemoryStorage) -> User {
        let mut doc = User::new("Dr. Gregory House", "house@example.com", "hash", Role::Doctor);
        doc.specialization = Some("Diagnostics".into());
        doc.license_number = Some("MD-1234".into());
        store.create_user(doc).await.unwrap()
    }

    async fn seed_patient(store: &MemoryStorage, email: &str) -> User {
        store
            .create_user(User::new("Pat Doe", email, "hash", Role::Patient))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_rejected_case_insensitively() {
        let store = MemoryStorage::new();
        seed_patient(&store, "pat@example.com").await;
        let err = store
            .create_user(User::new("Other", "PAT@example.com", "hash", Role::Patient))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn find_by_email_normalizes_case() {
        let store = MemoryStorage::new();
        let pat = seed_patient(&store, "pat@example.com").await;
        let found = store.find_user_by_email("Pat@Example.COM").await.unwrap();
        assert_eq!(found.unwrap().id, pat.id);
    }

    #[tokio::test]
    async fn deactivated_users_hidden_from_default_listing() {
        let store = MemoryStorage::new();
        let pat = seed_patient(&store, "pat@example.com").await;
        seed_patient(&store, "other@example.com").await;
        store.set_user_active(pat.id, false).await.unwrap();

        let page = store
            .list_users(&UserFilter::default(), &PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].email, "other@example.com");

        // Explicitly asking for inactive accounts still works
        let inactive = store
            .list_users(
                &UserFilter {
                    active: Some(false),
                    ..Default::default()
                },
                &PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(inactive.total, 1);
        assert_eq!(inactive.items[0].id, pat.id);
    }

    #[tokio::test]
    async fn list_doctors_excludes_inactive_and_non_doctors() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        seed_patient(&store, "pat@example.com").await;
        let doctors = store.list_doctors().await.unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].id, doc.id);

        store.set_user_active(doc.id, false).await.unwrap();
        assert!(store.list_doctors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn double_booking_same_slot_rejected() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;
        let other = seed_patient(&store, "other@example.com").await;

        let day = date!(2026 - 09 - 01);
        store
            .create_appointment(Appointment::new(pat.id, doc.id, day, slot("09:30")))
            .await
            .unwrap();

        let err = store
            .create_appointment(Appointment::new(other.id, doc.id, day, slot("09:30")))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SlotTaken { .. }));

        // A different time or day is fine
        store
            .create_appointment(Appointment::new(other.id, doc.id, day, slot("10:00")))
            .await
            .unwrap();
        store
            .create_appointment(Appointment::new(
                other.id,
                doc.id,
                date!(2026 - 09 - 02),
                slot("09:30"),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_appointment_frees_the_slot() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;
        let day = date!(2026 - 09 - 01);

        let appt = store
            .create_appointment(Appointment::new(pat.id, doc.id, day, slot("09:30")))
            .await
            .unwrap();
        store
            .set_appointment_status(appt.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        store
            .create_appointment(Appointment::new(pat.id, doc.id, day, slot("09:30")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_change_cannot_reclaim_a_rebooked_slot() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;
        let other = seed_patient(&store, "other@example.com").await;
        let day = date!(2026 - 09 - 01);

        let first = store
            .create_appointment(Appointment::new(pat.id, doc.id, day, slot("09:30")))
            .await
            .unwrap();
        store
            .set_appointment_status(first.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();
        let second = store
            .create_appointment(Appointment::new(other.id, doc.id, day, slot("09:30")))
            .await
            .unwrap();

        // The slot now belongs to the rebooking
        let err = store
            .set_appointment_status(first.id, AppointmentStatus::Scheduled)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::SlotTaken { .. }));

        // Re-asserting scheduled on the holder is not a self-conflict
        let updated = store
            .set_appointment_status(second.id, AppointmentStatus::Scheduled)
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Scheduled);

        // Once the holder completes, the original may be re-scheduled
        store
            .set_appointment_status(second.id, AppointmentStatus::Completed)
            .await
            .unwrap();
        store
            .set_appointment_status(first.id, AppointmentStatus::Scheduled)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reschedule_conflict_excludes_self() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;
        let day = date!(2026 - 09 - 01);

        let appt = store
            .create_appointment(Appointment::new(pat.id, doc.id, day, slot("09:30")))
            .await
            .unwrap();

        // Saving the same slot back is not a conflict with itself
        let mut unchanged = appt.clone();
        unchanged.notes = Some("bring referral".into());
        store.update_appointment(unchanged).await.unwrap();

        // Moving onto another booked slot is
        let taken = store
            .create_appointment(Appointment::new(pat.id, doc.id, day, slot("10:00")))
            .await
            .unwrap();
        let mut moved = appt.clone();
        moved.time = taken.time.clone();
        let err = store.update_appointment(moved).await.unwrap_err();
        assert!(matches!(err, StorageError::SlotTaken { .. }));
    }

    #[tokio::test]
    async fn concurrent_bookings_cannot_both_win() {
        let store = std::sync::Arc::new(MemoryStorage::new());
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;
        let other = seed_patient(&store, "other@example.com").await;
        let day = date!(2026 - 09 - 01);

        let a = {
            let store = store.clone();
            let appt = Appointment::new(pat.id, doc.id, day, slot("09:30"));
            tokio::spawn(async move { store.create_appointment(appt).await })
        };
        let b = {
            let store = store.clone();
            let appt = Appointment::new(other.id, doc.id, day, slot("09:30"));
            tokio::spawn(async move { store.create_appointment(appt).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one concurrent booking must succeed");
    }

    #[tokio::test]
    async fn appointments_sorted_by_date_then_time() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;

        store
            .create_appointment(Appointment::new(
                pat.id,
                doc.id,
                date!(2026 - 09 - 02),
                slot("08:00"),
            ))
            .await
            .unwrap();
        store
            .create_appointment(Appointment::new(
                pat.id,
                doc.id,
                date!(2026 - 09 - 01),
                slot("14:00"),
            ))
            .await
            .unwrap();
        store
            .create_appointment(Appointment::new(
                pat.id,
                doc.id,
                date!(2026 - 09 - 01),
                slot("09:00"),
            ))
            .await
            .unwrap();

        let page = store
            .list_appointments(&AppointmentFilter::default(), &PageParams::default())
            .await
            .unwrap();
        let times: Vec<String> = page
            .items
            .iter()
            .map(|a| format!("{} {}", a.date, a.time))
            .collect();
        assert_eq!(
            times,
            vec!["2026-09-01 09:00", "2026-09-01 14:00", "2026-09-02 08:00"]
        );
    }

    #[tokio::test]
    async fn hard_delete_removes_appointment() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;
        let appt = store
            .create_appointment(Appointment::new(
                pat.id,
                doc.id,
                date!(2026 - 09 - 01),
                slot("09:30"),
            ))
            .await
            .unwrap();

        store.delete_appointment(appt.id).await.unwrap();
        assert!(store.get_appointment(appt.id).await.unwrap().is_none());
        let err = store.delete_appointment(appt.id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn soft_deleted_records_hidden_but_readable() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;

        let record = store
            .create_record(MedicalRecord::new(pat.id, doc.id, "Sinusitis"))
            .await
            .unwrap();
        store.soft_delete_record(record.id).await.unwrap();

        let page = store
            .list_records(&RecordFilter::default(), &PageParams::default())
            .await
            .unwrap();
        assert!(page.is_empty());

        // Retained in storage, readable by ID
        let stored = store.get_record(record.id).await.unwrap().unwrap();
        assert!(!stored.active);
    }

    #[tokio::test]
    async fn record_filters_scope_by_party() {
        let store = MemoryStorage::new();
        let doc = seed_doctor(&store).await;
        let pat = seed_patient(&store, "pat@example.com").await;
        let other = seed_patient(&store, "other@example.com").await;

        store
            .create_record(MedicalRecord::new(pat.id, doc.id, "Sinusitis"))
            .await
            .unwrap();
        store
            .create_record(MedicalRecord::new(other.id, doc.id, "Flu"))
            .await
            .unwrap();

        let filter = RecordFilter {
            patient_id: Some(pat.id),
            ..Default::default()
        };
        let page = store
            .list_records(&filter, &PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].diagnosis, "Sinusitis");
    }
}
