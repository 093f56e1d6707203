//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for doctor signup, login, and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use doctor_finder_core::otp::sanitize_identifier;
use doctor_finder_core::validation::{password_strength, strength_label, validate_signup, SignupForm};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::doctors::DoctorResponse;
use crate::web::errors::{invalid, port_failure, HandlerError};
use crate::web::middleware::{session_id_from_headers, SESSION_COOKIE};
use crate::web::state::AppState;

const SESSION_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub department: String,
    pub hospital: String,
    pub degree: String,
    /// Chamber hours, e.g. "5:30 PM".
    pub appointment_time: String,
    pub place: String,
    pub registration_number: String,
    /// `YYYY-MM-DD`
    pub dob: String,
}

impl From<SignupRequest> for SignupForm {
    fn from(req: SignupRequest) -> Self {
        SignupForm {
            name: req.name,
            phone: req.phone,
            email: req.email,
            password: req.password,
            confirm_password: req.confirm_password,
            department: req.department,
            hospital: req.hospital,
            degree: req.degree,
            appointment_time: req.appointment_time,
            place: req.place,
            registration_number: req.registration_number,
            dob: req.dob,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub uid: Uuid,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub doctor: DoctorResponse,
    /// Advisory strength label for the chosen password.
    pub password_strength: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Creates an auth session for `doctor_id` and returns the `Set-Cookie` value.
async fn start_session(state: &AppState, doctor_id: Uuid) -> Result<String, HandlerError> {
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);

    state
        .db
        .create_auth_session(&auth_session_id, doctor_id, expires_at)
        .await
        .map_err(|e| port_failure("Failed to create session", e))?;

    Ok(session_cookie(
        &auth_session_id,
        Duration::days(SESSION_DAYS).num_seconds(),
    ))
}

fn session_cookie(value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, value, max_age_secs
    )
}

/// A `Set-Cookie` value that clears the session cookie.
pub fn cleared_session_cookie() -> String {
    session_cookie("", 0)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Register a doctor account
///
/// The phone number must have been verified through `/otp/verify` shortly before.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Doctor created successfully", body = SignupResponse),
        (status = 400, description = "A field failed validation"),
        (status = 403, description = "Phone number not verified"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let now = Utc::now();
    let form = SignupForm::from(req);

    // 1. Validate every field
    let new_doctor = validate_signup(&form, now.date_naive()).map_err(invalid)?;

    // 2. Require a recent phone verification
    let identifier = sanitize_identifier(&new_doctor.phone);
    let verified = state
        .db
        .is_identifier_verified(&identifier, now - state.otp_policy.verification_window)
        .await
        .map_err(|e| port_failure("Failed to check phone verification", e))?;
    if !verified {
        return Err((
            StatusCode::FORBIDDEN,
            "Please verify your phone number first.".to_string(),
        ));
    }

    // 3. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(form.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    // 4. Create the doctor and a login session
    let doctor = state
        .db
        .create_doctor(new_doctor, &password_hash)
        .await
        .map_err(|e| port_failure("Failed to create account", e))?;
    let cookie = start_session(&state, doctor.uid).await?;
    info!(doctor_id = %doctor.uid, "Doctor registered");

    let response = SignupResponse {
        doctor: DoctorResponse::from(doctor),
        password_strength: strength_label(password_strength(&form.password)).to_string(),
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    // 1. Get doctor by email
    let creds = state
        .db
        .get_doctor_credentials_by_email(&req.email)
        .await
        .map_err(|e| {
            error!("Failed to get doctor: {:?}", e);
            (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()));
    }

    // 3. Create auth session and cookie
    let cookie = start_session(&state, creds.uid).await?;

    let response = AuthResponse {
        uid: creds.uid,
        email: creds.email,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let auth_session_id = session_id_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| port_failure("Failed to logout", e))?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_session_cookie())],
    ))
}
