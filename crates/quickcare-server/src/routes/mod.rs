//! HTTP route handlers, one module per resource.

use axum::Router;
use serde::Serialize;
use serde_json::Value;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use quickcare_api::ApiError;
use quickcare_core::{Appointment, AppointmentStatus, CoreError, SlotTime, User};
use quickcare_storage::{Page, PageParams, StorageError, UserStore};

use crate::config::AppConfig;
use crate::state::AppState;

pub mod appointments;
pub mod auth;
pub mod records;
pub mod users;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/appointments", appointments::router())
        .nest("/records", records::router())
}

/// Maps storage failures onto the wire error contract.
pub(crate) fn map_storage(err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound { kind, id } => ApiError::not_found(format!("{kind} {id} not found")),
        StorageError::DuplicateEmail(email) => {
            ApiError::conflict(format!("Email {email} is already registered"))
        }
        StorageError::SlotTaken { date, time, .. } => {
            ApiError::conflict(format!("Doctor is already booked on {date} at {time}"))
        }
        StorageError::Backend(msg) => ApiError::internal(msg),
    }
}

/// Maps a domain validation failure onto a 400 with field details.
pub(crate) fn map_core(err: CoreError) -> ApiError {
    match err {
        CoreError::InvalidField { field, message } => {
            ApiError::validation(vec![quickcare_api::FieldError::new(field, message)])
        }
        other => ApiError::bad_request(other.to_string()),
    }
}

/// Resolves page/limit query parameters against configured defaults
/// and the per-request cap.
pub(crate) fn page_params(cfg: &AppConfig, page: Option<u32>, limit: Option<u32>) -> PageParams {
    let limit = limit
        .unwrap_or(cfg.pagination.default_limit)
        .min(cfg.pagination.max_limit);
    PageParams::new(page.unwrap_or(1), limit)
}

/// Builds the list response envelope:
/// `{ <plural>: [...], total, totalPages, currentPage }`.
pub(crate) fn list_envelope<T: Serialize>(plural: &str, page: Page<T>) -> Result<Value, ApiError> {
    let items =
        serde_json::to_value(&page.items).map_err(|e| ApiError::internal(e.to_string()))?;
    let mut map = serde_json::Map::new();
    map.insert(plural.to_string(), items);
    map.insert("total".into(), page.total.into());
    map.insert("totalPages".into(), page.total_pages().into());
    map.insert("currentPage".into(), page.page.into());
    Ok(Value::Object(map))
}

/// Compact user reference embedded in appointment and record responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PartySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl From<User> for PartySummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            specialization: user.specialization,
        }
    }
}

/// Compact appointment reference embedded in record responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppointmentSummary {
    pub id: Uuid,
    pub date: Date,
    pub time: SlotTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Appointment> for AppointmentSummary {
    fn from(appt: Appointment) -> Self {
        Self {
            id: appt.id,
            date: appt.date,
            time: appt.time,
            reason: appt.reason,
        }
    }
}

/// An appointment with its user references populated. A reference to a
/// since-hard-deleted user serializes as `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppointmentView {
    pub id: Uuid,
    pub patient: Option<PartySummary>,
    pub doctor: Option<PartySummary>,
    pub date: Date,
    pub time: SlotTime,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub(crate) async fn load_party(
    users: &dyn UserStore,
    id: Uuid,
) -> Result<Option<PartySummary>, ApiError> {
    Ok(users
        .get_user(id)
        .await
        .map_err(map_storage)?
        .map(PartySummary::from))
}

pub(crate) async fn appointment_view(
    users: &dyn UserStore,
    appt: Appointment,
) -> Result<AppointmentView, ApiError> {
    let patient = load_party(users, appt.patient_id).await?;
    let doctor = load_party(users, appt.doctor_id).await?;
    Ok(AppointmentView {
        id: appt.id,
        patient,
        doctor,
        date: appt.date,
        time: appt.time,
        status: appt.status,
        reason: appt.reason,
        notes: appt.notes,
        duration: appt.duration,
        location: appt.location,
        created_at: appt.created_at,
        updated_at: appt.updated_at,
    })
}

/// Basic shape check for emails: one `@`, non-empty local part, dotted
/// domain.
pub(crate) fn valid_email(s: &str) -> bool {
    let mut parts = s.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("jane@example.com"));
        assert!(valid_email("j.doe@mail.example.org"));
        assert!(!valid_email("jane"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("jane@example"));
        assert!(!valid_email("jane@.com"));
        assert!(!valid_email("a@b@c.com"));
    }

    #[test]
    fn test_page_params_capped_by_config() {
        let cfg = AppConfig::default();
        let params = page_params(&cfg, Some(2), Some(10_000));
        assert_eq!(params.page, 2);
        assert_eq!(params.limit, cfg.pagination.max_limit);

        let params = page_params(&cfg, None, None);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, cfg.pagination.default_limit);
    }

    #[test]
    fn test_list_envelope_shape() {
        let page = Page::new(vec![1, 2, 3], 7, &PageParams::new(1, 3));
        let value = list_envelope("things", page).unwrap();
        assert_eq!(value["things"], serde_json::json!([1, 2, 3]));
        assert_eq!(value["total"], 7);
        assert_eq!(value["totalPages"], 3);
        assert_eq!(value["currentPage"], 1);
    }
}
