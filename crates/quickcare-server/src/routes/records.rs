//! Medical record routes. Records are authored by doctors, soft-deleted
//! rather than removed, and visible only to their parties and admins.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use quickcare_api::{ApiError, FieldError};
use quickcare_auth::AuthUser;
use quickcare_core::{
    AppointmentStatus, LabResult, MedicalRecord, Prescription, User, VitalSigns,
};
use quickcare_storage::{Page, RecordFilter};

use crate::state::AppState;

use super::{
    list_envelope, load_party, map_core, map_storage, page_params, AppointmentSummary,
    PartySummary,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route(
            "/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
}

/// A record with its references populated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordView {
    pub id: Uuid,
    pub patient: Option<PartySummary>,
    pub doctor: Option<PartySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<AppointmentSummary>,
    pub diagnosis: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prescriptions: Vec<Prescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vital_signs: Option<VitalSigns>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lab_results: Vec<LabResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<Date>,
    #[serde(rename = "isActive")]
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

async fn record_view(state: &AppState, record: MedicalRecord) -> Result<RecordView, ApiError> {
    let patient = load_party(state.users.as_ref(), record.patient_id).await?;
    let doctor = load_party(state.users.as_ref(), record.doctor_id).await?;
    let appointment = match record.appointment_id {
        Some(appt_id) => state
            .appointments
            .get_appointment(appt_id)
            .await
            .map_err(map_storage)?
            .map(AppointmentSummary::from),
        None => None,
    };
    Ok(RecordView {
        id: record.id,
        patient,
        doctor,
        appointment,
        diagnosis: record.diagnosis,
        symptoms: record.symptoms,
        prescriptions: record.prescriptions,
        vital_signs: record.vital_signs,
        lab_results: record.lab_results,
        notes: record.notes,
        follow_up_date: record.follow_up_date,
        active: record.active,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

/// Role scope: patients see records about them, doctors records they
/// authored, admins everything.
fn scoped_filter(caller: &User, query: &ListRecordsQuery) -> RecordFilter {
    if caller.role.is_admin() {
        RecordFilter {
            patient_id: query.patient_id,
            doctor_id: query.doctor_id,
        }
    } else if caller.role.is_doctor() {
        RecordFilter {
            patient_id: query.patient_id,
            doctor_id: Some(caller.id),
        }
    } else {
        RecordFilter {
            patient_id: Some(caller.id),
            doctor_id: query.doctor_id,
        }
    }
}

async fn list_records(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = scoped_filter(&caller, &query);
    let params = page_params(&state.config, query.page, query.limit);
    let page = state
        .records
        .list_records(&filter, &params)
        .await
        .map_err(map_storage)?;

    let mut views = Vec::with_capacity(page.items.len());
    for record in &page.items {
        views.push(record_view(&state, record.clone()).await?);
    }
    let page: Page<RecordView> = Page {
        items: views,
        total: page.total,
        page: page.page,
        limit: page.limit,
    };
    Ok(Json(list_envelope("records", page)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub patient_id: Uuid,
    /// Admin only; doctors always author as themselves.
    pub doctor_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub diagnosis: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    pub vital_signs: Option<VitalSigns>,
    #[serde(default)]
    pub lab_results: Vec<LabResult>,
    pub notes: Option<String>,
    pub follow_up_date: Option<Date>,
}

async fn create_record(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateRecordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !caller.role.is_doctor() && !caller.role.is_admin() {
        return Err(ApiError::forbidden("Only doctors can create records"));
    }

    let doctor_id = if caller.role.is_doctor() {
        caller.id
    } else {
        // Admin must name the authoring doctor
        let doctor_id = req.doctor_id.ok_or_else(|| {
            ApiError::validation(vec![FieldError::new("doctorId", "required for admins")])
        })?;
        let doctor = state.users.get_user(doctor_id).await.map_err(map_storage)?;
        if doctor.map_or(true, |d| !d.role.is_doctor()) {
            return Err(ApiError::validation(vec![FieldError::new(
                "doctorId",
                "must reference a doctor",
            )]));
        }
        doctor_id
    };

    let patient = state
        .users
        .get_user(req.patient_id)
        .await
        .map_err(map_storage)?;
    if patient.map_or(true, |p| !p.role.is_patient()) {
        return Err(ApiError::validation(vec![FieldError::new(
            "patientId",
            "must reference a patient",
        )]));
    }

    if let Some(appt_id) = req.appointment_id {
        let appt = state
            .appointments
            .get_appointment(appt_id)
            .await
            .map_err(map_storage)?
            .ok_or_else(|| {
                ApiError::validation(vec![FieldError::new(
                    "appointmentId",
                    "must reference an existing appointment",
                )])
            })?;
        if appt.patient_id != req.patient_id {
            return Err(ApiError::validation(vec![FieldError::new(
                "appointmentId",
                "must belong to the same patient",
            )]));
        }
    }

    let mut record = MedicalRecord::new(req.patient_id, doctor_id, req.diagnosis);
    record.appointment_id = req.appointment_id;
    record.symptoms = req.symptoms;
    record.prescriptions = req.prescriptions;
    record.vital_signs = req.vital_signs;
    record.lab_results = req.lab_results;
    record.notes = req.notes;
    record.follow_up_date = req.follow_up_date;
    record.validate().map_err(map_core)?;

    let record = state
        .records
        .create_record(record)
        .await
        .map_err(map_storage)?;

    // The documented visit is over; close out the linked appointment
    if let Some(appt_id) = record.appointment_id {
        state
            .appointments
            .set_appointment_status(appt_id, AppointmentStatus::Completed)
            .await
            .map_err(map_storage)?;
    }

    tracing::info!(
        record_id = %record.id,
        patient_id = %record.patient_id,
        doctor_id = %record.doctor_id,
        "Medical record created"
    );
    let view = record_view(&state, record).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Loads a record and checks the caller may read it.
async fn load_readable(state: &AppState, caller: &User, id: Uuid) -> Result<MedicalRecord, ApiError> {
    let record = state
        .records
        .get_record(id)
        .await
        .map_err(map_storage)?
        .ok_or_else(|| ApiError::not_found(format!("Record {id} not found")))?;
    if !caller.role.is_admin() && !record.involves(caller.id) {
        return Err(ApiError::forbidden("Not a party to this record"));
    }
    Ok(record)
}

async fn get_record(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecordView>, ApiError> {
    let record = load_readable(&state, &caller, id).await?;
    Ok(Json(record_view(&state, record).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    pub diagnosis: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub prescriptions: Option<Vec<Prescription>>,
    pub vital_signs: Option<VitalSigns>,
    pub lab_results: Option<Vec<LabResult>>,
    pub notes: Option<String>,
    pub follow_up_date: Option<Date>,
}

/// Writes are limited to the authoring doctor and admins; the patient
/// and doctor references are immutable.
fn may_write(caller: &User, record: &MedicalRecord) -> bool {
    caller.role.is_admin() || (caller.role.is_doctor() && record.doctor_id == caller.id)
}

async fn update_record(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRecordRequest>,
) -> Result<Json<RecordView>, ApiError> {
    let mut record = load_readable(&state, &caller, id).await?;
    if !may_write(&caller, &record) {
        return Err(ApiError::forbidden("Only the authoring doctor or an admin can update a record"));
    }

    if let Some(diagnosis) = req.diagnosis {
        record.diagnosis = diagnosis;
    }
    if let Some(symptoms) = req.symptoms {
        record.symptoms = symptoms;
    }
    if let Some(prescriptions) = req.prescriptions {
        record.prescriptions = prescriptions;
    }
    if req.vital_signs.is_some() {
        record.vital_signs = req.vital_signs;
    }
    if let Some(lab_results) = req.lab_results {
        record.lab_results = lab_results;
    }
    if req.notes.is_some() {
        record.notes = req.notes;
    }
    if req.follow_up_date.is_some() {
        record.follow_up_date = req.follow_up_date;
    }
    record.validate().map_err(map_core)?;
    record.touch();

    let record = state
        .records
        .update_record(record)
        .await
        .map_err(map_storage)?;
    tracing::info!(record_id = %record.id, "Medical record updated");
    Ok(Json(record_view(&state, record).await?))
}

async fn delete_record(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = load_readable(&state, &caller, id).await?;
    if !may_write(&caller, &record) {
        return Err(ApiError::forbidden("Only the authoring doctor or an admin can delete a record"));
    }
    state
        .records
        .soft_delete_record(id)
        .await
        .map_err(map_storage)?;
    tracing::info!(record_id = %id, user_id = %caller.id, "Medical record deactivated");
    Ok(Json(json!({ "message": "Record deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcare_core::Role;

    #[test]
    fn test_scope_by_role() {
        let q = ListRecordsQuery {
            page: None,
            limit: None,
            patient_id: Some(Uuid::new_v4()),
            doctor_id: Some(Uuid::new_v4()),
        };

        let patient = User::new("Pat", "pat@example.com", "hash", Role::Patient);
        let filter = scoped_filter(&patient, &q);
        assert_eq!(filter.patient_id, Some(patient.id));

        let doctor = User::new("Doc", "doc@example.com", "hash", Role::Doctor);
        let filter = scoped_filter(&doctor, &q);
        assert_eq!(filter.doctor_id, Some(doctor.id));
        assert_eq!(filter.patient_id, q.patient_id);

        let admin = User::new("Root", "root@example.com", "hash", Role::Admin);
        let filter = scoped_filter(&admin, &q);
        assert_eq!(filter.patient_id, q.patient_id);
        assert_eq!(filter.doctor_id, q.doctor_id);
    }

    #[test]
    fn test_write_permission() {
        let doctor = User::new("Doc", "doc@example.com", "hash", Role::Doctor);
        let other = User::new("Doc2", "doc2@example.com", "hash", Role::Doctor);
        let admin = User::new("Root", "root@example.com", "hash", Role::Admin);
        let patient = User::new("Pat", "pat@example.com", "hash", Role::Patient);

        let record = MedicalRecord::new(patient.id, doctor.id, "Flu");
        assert!(may_write(&doctor, &record));
        assert!(may_write(&admin, &record));
        assert!(!may_write(&other, &record));
        assert!(!may_write(&patient, &record));
    }
}
