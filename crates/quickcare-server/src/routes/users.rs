//! User management routes. Most are admin-only; profile reads and
//! updates are also open to the account owner.

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

use quickcare_api::ApiError;
use quickcare_auth::{AdminUser, AuthUser};
use quickcare_core::{Gender, Role, User};
use quickcare_storage::UserFilter;

use crate::state::AppState;

use super::auth::{build_account, validate_new_account, RegisterRequest};
use super::{list_envelope, map_storage, page_params, valid_email};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/doctors", get(list_doctors))
        .route("/{id}", get(get_user).put(update_user).delete(deactivate_user))
        .route("/{id}/status", patch(set_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<Role>,
    pub search: Option<String>,
    pub active: Option<bool>,
}

async fn list_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = UserFilter {
        role: query.role,
        search: query.search,
        active: query.active,
    };
    let params = page_params(&state.config, query.page, query.limit);
    let page = state
        .users
        .list_users(&filter, &params)
        .await
        .map_err(map_storage)?;
    Ok(Json(list_envelope("users", page)?))
}

async fn create_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = validate_new_account(&req, true);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }
    let user = build_account(req)?;
    let user = state.users.create_user(user).await.map_err(map_storage)?;
    tracing::info!(admin_id = %admin.id, user_id = %user.id, role = %user.role, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_doctors(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let doctors = state.users.list_doctors().await.map_err(map_storage)?;
    Ok(Json(json!({ "doctors": doctors })))
}

async fn get_user(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    if !caller.role.is_admin() && caller.id != id {
        return Err(ApiError::forbidden("Cannot access another user's profile"));
    }
    let user = state
        .users
        .get_user(id)
        .await
        .map_err(map_storage)?
        .ok_or_else(|| ApiError::not_found(format!("User {id} not found")))?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<Gender>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub role: Option<Role>,
}

async fn update_user(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    if !caller.role.is_admin() && caller.id != id {
        return Err(ApiError::forbidden("Cannot update another user's profile"));
    }
    if req.role.is_some() && !caller.role.is_admin() {
        return Err(ApiError::forbidden("Only admins can change roles"));
    }

    let mut user = state
        .users
        .get_user(id)
        .await
        .map_err(map_storage)?
        .ok_or_else(|| ApiError::not_found(format!("User {id} not found")))?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation(vec![quickcare_api::FieldError::new(
                "name",
                "must not be empty",
            )]));
        }
        user.name = name.trim().to_string();
    }
    if let Some(email) = req.email {
        if !valid_email(&email) {
            return Err(ApiError::validation(vec![quickcare_api::FieldError::new(
                "email",
                "must be a valid email address",
            )]));
        }
        user.email = email.trim().to_lowercase();
    }
    if let Some(role) = req.role {
        user.role = role;
    }
    if req.phone.is_some() {
        user.phone = req.phone;
    }
    if req.address.is_some() {
        user.address = req.address;
    }
    if req.date_of_birth.is_some() {
        user.date_of_birth = req.date_of_birth;
    }
    if req.gender.is_some() {
        user.gender = req.gender;
    }
    if req.specialization.is_some() {
        user.specialization = req.specialization;
    }
    if req.license_number.is_some() {
        user.license_number = req.license_number;
    }
    user.touch();

    // Duplicate email is rejected by the storage layer (409)
    let user = state.users.update_user(user).await.map_err(map_storage)?;
    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

async fn set_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<User>, ApiError> {
    if admin.id == id && !req.is_active {
        return Err(ApiError::bad_request("Admins cannot deactivate themselves"));
    }
    let user = state
        .users
        .set_user_active(id, req.is_active)
        .await
        .map_err(map_storage)?;
    tracing::info!(admin_id = %admin.id, user_id = %user.id, active = user.active, "User status changed");
    Ok(Json(user))
}

async fn deactivate_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if admin.id == id {
        return Err(ApiError::bad_request("Admins cannot delete themselves"));
    }
    state
        .users
        .set_user_active(id, false)
        .await
        .map_err(map_storage)?;
    tracing::info!(admin_id = %admin.id, user_id = %id, "User deactivated");
    Ok(Json(json!({ "message": "User deactivated" })))
}
