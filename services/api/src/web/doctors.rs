//! services/api/src/web/doctors.rs
//!
//! Patient-facing doctor browsing, plus the signed-in doctor's own profile.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use doctor_finder_core::directory::{self, DoctorFilter};
use doctor_finder_core::domain::{Doctor, DoctorProfileUpdate};
use doctor_finder_core::validation::validate_profile_update;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::auth::cleared_session_cookie;
use crate::web::errors::{invalid, port_failure, HandlerError};
use crate::web::middleware::DoctorId;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorResponse {
    pub uid: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub department: String,
    pub hospital: String,
    pub degree: String,
    pub appointment_time: String,
    pub place: String,
    pub registration_number: String,
    pub dob: NaiveDate,
    pub age: u32,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Doctor> for DoctorResponse {
    fn from(d: Doctor) -> Self {
        Self {
            uid: d.uid,
            name: d.name,
            phone: d.phone,
            email: d.email,
            department: d.department,
            hospital: d.hospital,
            degree: d.degree,
            appointment_time: d.appointment_time,
            place: d.place,
            registration_number: d.registration_number,
            dob: d.dob,
            age: d.age,
            role: d.role,
            status: d.status.as_str().to_string(),
            created_at: d.created_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DoctorQuery {
    /// Exact department, case-insensitive.
    pub department: Option<String>,
    /// Exact hospital, case-insensitive.
    pub hospital: Option<String>,
    /// Free-text search over name, department and hospital.
    pub q: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring filter.
    pub q: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub hospital: String,
    pub degree: String,
    pub appointment_time: String,
    pub place: String,
}

impl From<UpdateProfileRequest> for DoctorProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        DoctorProfileUpdate {
            name: req.name.trim().to_string(),
            phone: req.phone.trim().to_string(),
            email: req.email.trim().to_string(),
            hospital: req.hospital.trim().to_string(),
            degree: req.degree.trim().to_string(),
            appointment_time: req.appointment_time.trim().to_string(),
            place: req.place.trim().to_string(),
        }
    }
}

//=========================================================================================
// Browsing Handlers
//=========================================================================================

/// List active doctors, optionally filtered.
#[utoipa::path(
    get,
    path = "/doctors",
    params(DoctorQuery),
    responses(
        (status = 200, description = "Matching doctors", body = [DoctorResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_doctors_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<Vec<DoctorResponse>>, HandlerError> {
    let doctors = state
        .db
        .list_doctors()
        .await
        .map_err(|e| port_failure("Failed to load doctors", e))?;

    let filter = DoctorFilter {
        department: query.department,
        hospital: query.hospital,
        query: query.q,
    };
    let found = directory::filter_doctors(doctors, &filter)
        .into_iter()
        .map(DoctorResponse::from)
        .collect();
    Ok(Json(found))
}

/// Fetch one doctor's public profile.
#[utoipa::path(
    get,
    path = "/doctors/{uid}",
    params(("uid" = Uuid, Path, description = "The doctor's uid.")),
    responses(
        (status = 200, description = "The doctor", body = DoctorResponse),
        (status = 404, description = "No such doctor")
    )
)]
pub async fn get_doctor_handler(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<Uuid>,
) -> Result<Json<DoctorResponse>, HandlerError> {
    let doctor = state
        .db
        .get_doctor(uid)
        .await
        .map_err(|e| port_failure("Failed to load doctor", e))?;
    Ok(Json(doctor.into()))
}

/// Distinct department names across active doctors.
#[utoipa::path(
    get,
    path = "/departments",
    params(SearchQuery),
    responses((status = 200, description = "Sorted department names", body = [String]))
)]
pub async fn list_departments_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<String>>, HandlerError> {
    let doctors = state
        .db
        .list_doctors()
        .await
        .map_err(|e| port_failure("Failed to load departments", e))?;
    Ok(Json(directory::departments(&doctors, query.q.as_deref())))
}

/// Distinct hospital names across active doctors.
#[utoipa::path(
    get,
    path = "/hospitals",
    params(SearchQuery),
    responses((status = 200, description = "Sorted hospital names", body = [String]))
)]
pub async fn list_hospitals_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<String>>, HandlerError> {
    let doctors = state
        .db
        .list_doctors()
        .await
        .map_err(|e| port_failure("Failed to load hospitals", e))?;
    Ok(Json(directory::hospitals(&doctors, query.q.as_deref())))
}

//=========================================================================================
// Own Profile Handlers (auth required)
//=========================================================================================

/// The signed-in doctor's profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The profile", body = DoctorResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(DoctorId(doctor_id)): Extension<DoctorId>,
) -> Result<Json<DoctorResponse>, HandlerError> {
    let doctor = state
        .db
        .get_doctor(doctor_id)
        .await
        .map_err(|e| port_failure("Failed to load profile", e))?;
    Ok(Json(doctor.into()))
}

/// Update the editable profile fields.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = DoctorResponse),
        (status = 400, description = "A field failed validation"),
        (status = 401, description = "Not signed in"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(DoctorId(doctor_id)): Extension<DoctorId>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<DoctorResponse>, HandlerError> {
    let update = DoctorProfileUpdate::from(req);
    validate_profile_update(&update).map_err(invalid)?;

    let doctor = state
        .db
        .update_doctor_profile(doctor_id, update)
        .await
        .map_err(|e| port_failure("Failed to update profile", e))?;
    info!(%doctor_id, "Profile updated");
    Ok(Json(doctor.into()))
}

/// Permanently delete the signed-in doctor's account and bookings.
#[utoipa::path(
    delete,
    path = "/me",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn delete_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(DoctorId(doctor_id)): Extension<DoctorId>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .db
        .delete_doctor(doctor_id)
        .await
        .map_err(|e| port_failure("Failed to delete account", e))?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cleared_session_cookie())],
    ))
}
