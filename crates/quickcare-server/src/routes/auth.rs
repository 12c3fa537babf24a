//! Registration, login and current-user routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use time::Date;

use quickcare_api::{ApiError, FieldError};
use quickcare_auth::password::{hash_password, verify_password};
use quickcare_auth::AuthUser;
use quickcare_core::{Gender, Role, User};

use crate::config::MIN_PASSWORD_LEN;
use crate::state::AppState;

use super::{map_storage, valid_email};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<Gender>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
}

/// Validates a new-account request. `allow_admin` is false for public
/// registration; the admin user-management route passes true.
pub(crate) fn validate_new_account(req: &RegisterRequest, allow_admin: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if req.name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }
    if !valid_email(&req.email) {
        errors.push(FieldError::new("email", "must be a valid email address"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    let role = req.role.unwrap_or(Role::Patient);
    if role.is_admin() && !allow_admin {
        errors.push(FieldError::new("role", "admin accounts cannot self-register"));
    }
    if role.is_doctor() {
        if req
            .specialization
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
        {
            errors.push(FieldError::new("specialization", "required for doctors"));
        }
        if req
            .license_number
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
        {
            errors.push(FieldError::new("licenseNumber", "required for doctors"));
        }
    }
    errors
}

/// Builds the stored user from a validated request.
pub(crate) fn build_account(req: RegisterRequest) -> Result<User, ApiError> {
    let role = req.role.unwrap_or(Role::Patient);
    let hash = hash_password(&req.password).map_err(|e| ApiError::internal(e.to_string()))?;
    let mut user = User::new(req.name.trim(), req.email.trim(), hash, role);
    user.phone = req.phone;
    user.address = req.address;
    user.date_of_birth = req.date_of_birth;
    user.gender = req.gender;
    user.specialization = req.specialization;
    user.license_number = req.license_number;
    Ok(user)
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = validate_new_account(&req, false);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let user = build_account(req)?;
    let user = state.users.create_user(user).await.map_err(map_storage)?;
    let token = state.jwt.issue(&user)?;

    tracing::info!(user_id = %user.id, role = %user.role, "Account registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "token": token,
            "user": user,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // One message for unknown email and wrong password; no account
    // enumeration through the login route.
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .users
        .find_user_by_email(&req.email)
        .await
        .map_err(map_storage)?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash)
        .map_err(|e| ApiError::internal(e.to_string()))?
    {
        return Err(invalid());
    }
    if !user.active {
        return Err(ApiError::forbidden("Account is deactivated"));
    }

    let token = state.jwt.issue(&user)?;
    tracing::info!(user_id = %user.id, "Login succeeded");
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}

async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
