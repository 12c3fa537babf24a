//! Appointment booking and lifecycle routes.
//!
//! The slot-conflict invariant lives in the storage layer; handlers
//! surface `SlotTaken` as a 409 and never do their own
//! read-then-write check.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use time::Date;
use uuid::Uuid;

use quickcare_api::{ApiError, FieldError};
use quickcare_auth::AuthUser;
use quickcare_core::{now_utc, Appointment, AppointmentStatus, SlotTime, User};
use quickcare_storage::{AppointmentFilter, Page};

use crate::state::AppState;

use super::{appointment_view, list_envelope, map_storage, page_params, AppointmentView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route(
            "/{id}",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/{id}/status", patch(set_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAppointmentsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<Date>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

/// Builds the list filter with the caller's role-based scope applied.
/// Query filters narrow further but never widen past the scope.
fn scoped_filter(caller: &User, query: &ListAppointmentsQuery) -> AppointmentFilter {
    let mut filter = AppointmentFilter {
        status: query.status,
        date: query.date,
        ..Default::default()
    };
    if caller.role.is_admin() {
        filter.patient_id = query.patient_id;
        filter.doctor_id = query.doctor_id;
    } else if caller.role.is_doctor() {
        filter.doctor_id = Some(caller.id);
        filter.patient_id = query.patient_id;
    } else {
        filter.patient_id = Some(caller.id);
        filter.doctor_id = query.doctor_id;
    }
    filter
}

async fn list_appointments(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = scoped_filter(&caller, &query);
    let params = page_params(&state.config, query.page, query.limit);
    let page = state
        .appointments
        .list_appointments(&filter, &params)
        .await
        .map_err(map_storage)?;

    let mut views = Vec::with_capacity(page.items.len());
    for appt in &page.items {
        views.push(appointment_view(state.users.as_ref(), appt.clone()).await?);
    }
    let page: Page<AppointmentView> = Page {
        items: views,
        total: page.total,
        page: page.page,
        limit: page.limit,
    };
    Ok(Json(list_envelope("appointments", page)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: Date,
    pub time: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub duration: Option<u32>,
    pub location: Option<String>,
    /// Admin only; other callers book for themselves.
    pub patient_id: Option<Uuid>,
}

async fn create_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let time: SlotTime = req
        .time
        .parse()
        .map_err(|_| ApiError::validation(vec![FieldError::new("time", "must match HH:MM")]))?;

    if req.date < now_utc().date() {
        return Err(ApiError::validation(vec![FieldError::new(
            "date",
            "must not be in the past",
        )]));
    }

    let doctor = state
        .users
        .get_user(req.doctor_id)
        .await
        .map_err(map_storage)?;
    if !doctor.map_or(false, |d| d.is_bookable_doctor()) {
        return Err(ApiError::validation(vec![FieldError::new(
            "doctorId",
            "must reference an active doctor",
        )]));
    }

    let patient_id = match req.patient_id {
        Some(other) if other != caller.id => {
            if !caller.role.is_admin() {
                return Err(ApiError::forbidden(
                    "Only admins can book for another patient",
                ));
            }
            let patient = state.users.get_user(other).await.map_err(map_storage)?;
            if patient.map_or(true, |p| !p.active) {
                return Err(ApiError::validation(vec![FieldError::new(
                    "patientId",
                    "must reference an active user",
                )]));
            }
            other
        }
        _ => caller.id,
    };

    let mut appt = Appointment::new(patient_id, req.doctor_id, req.date, time);
    appt.reason = req.reason;
    appt.notes = req.notes;
    appt.location = req.location;
    if let Some(duration) = req.duration {
        appt.duration = duration;
    }

    // SlotTaken maps to 409
    let appt = state
        .appointments
        .create_appointment(appt)
        .await
        .map_err(map_storage)?;
    tracing::info!(
        appointment_id = %appt.id,
        doctor_id = %appt.doctor_id,
        date = %appt.date,
        time = %appt.time,
        "Appointment booked"
    );

    let view = appointment_view(state.users.as_ref(), appt).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Loads an appointment and checks the caller is admin or a party.
async fn load_authorized(
    state: &AppState,
    caller: &User,
    id: Uuid,
) -> Result<Appointment, ApiError> {
    let appt = state
        .appointments
        .get_appointment(id)
        .await
        .map_err(map_storage)?
        .ok_or_else(|| ApiError::not_found(format!("Appointment {id} not found")))?;
    if !caller.role.is_admin() && !appt.involves(caller.id) {
        return Err(ApiError::forbidden("Not a party to this appointment"));
    }
    Ok(appt)
}

async fn get_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentView>, ApiError> {
    let appt = load_authorized(&state, &caller, id).await?;
    Ok(Json(appointment_view(state.users.as_ref(), appt).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub date: Option<Date>,
    pub time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub duration: Option<u32>,
    pub location: Option<String>,
}

async fn update_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<Json<AppointmentView>, ApiError> {
    let mut appt = load_authorized(&state, &caller, id).await?;

    if let Some(date) = req.date {
        appt.date = date;
    }
    if let Some(ref time) = req.time {
        appt.time = time.parse().map_err(|_| {
            ApiError::validation(vec![FieldError::new("time", "must match HH:MM")])
        })?;
    }
    if let Some(status) = req.status {
        appt.status = status;
    }
    if req.reason.is_some() {
        appt.reason = req.reason;
    }
    if req.notes.is_some() {
        appt.notes = req.notes;
    }
    if let Some(duration) = req.duration {
        appt.duration = duration;
    }
    if req.location.is_some() {
        appt.location = req.location;
    }
    appt.touch();

    // Date/time moves re-run the conflict check, excluding this row
    let appt = state
        .appointments
        .update_appointment(appt)
        .await
        .map_err(map_storage)?;
    tracing::info!(appointment_id = %appt.id, "Appointment updated");
    Ok(Json(appointment_view(state.users.as_ref(), appt).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AppointmentStatus,
}

async fn set_status(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<AppointmentView>, ApiError> {
    let appt = state
        .appointments
        .get_appointment(id)
        .await
        .map_err(map_storage)?
        .ok_or_else(|| ApiError::not_found(format!("Appointment {id} not found")))?;

    let allowed = caller.role.is_admin() || (caller.role.is_doctor() && appt.doctor_id == caller.id);
    if !allowed {
        return Err(ApiError::forbidden(
            "Only the doctor or an admin can change appointment status",
        ));
    }

    let appt = state
        .appointments
        .set_appointment_status(id, req.status)
        .await
        .map_err(map_storage)?;
    tracing::info!(appointment_id = %appt.id, status = %appt.status, "Appointment status changed");
    Ok(Json(appointment_view(state.users.as_ref(), appt).await?))
}

async fn delete_appointment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    load_authorized(&state, &caller, id).await?;
    state
        .appointments
        .delete_appointment(id)
        .await
        .map_err(map_storage)?;
    tracing::info!(appointment_id = %id, user_id = %caller.id, "Appointment deleted");
    Ok(Json(json!({ "message": "Appointment deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcare_core::Role;

    fn query() -> ListAppointmentsQuery {
        ListAppointmentsQuery {
            page: None,
            limit: None,
            status: None,
            date: None,
            doctor_id: Some(Uuid::new_v4()),
            patient_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_patient_scope_pins_patient_id() {
        let patient = User::new("Pat", "pat@example.com", "hash", Role::Patient);
        let q = query();
        let filter = scoped_filter(&patient, &q);
        assert_eq!(filter.patient_id, Some(patient.id));
        // May still narrow by doctor
        assert_eq!(filter.doctor_id, q.doctor_id);
    }

    #[test]
    fn test_doctor_scope_pins_doctor_id() {
        let doctor = User::new("Doc", "doc@example.com", "hash", Role::Doctor);
        let q = query();
        let filter = scoped_filter(&doctor, &q);
        assert_eq!(filter.doctor_id, Some(doctor.id));
        assert_eq!(filter.patient_id, q.patient_id);
    }

    #[test]
    fn test_admin_scope_is_unpinned() {
        let admin = User::new("Root", "root@example.com", "hash", Role::Admin);
        let q = query();
        let filter = scoped_filter(&admin, &q);
        assert_eq!(filter.patient_id, q.patient_id);
        assert_eq!(filter.doctor_id, q.doctor_id);
    }
}
