//! services/api/src/web/bookings.rs
//!
//! Booking submission by patients and the accept/reject workflow for the
//! doctor who owns the booking.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use doctor_finder_core::domain::{Booking, BookingStats};
use doctor_finder_core::validation::{validate_booking, BookingForm};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::notifications::spawn_acceptance_notices;
use crate::web::errors::{invalid, port_failure, HandlerError};
use crate::web::middleware::DoctorId;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub patient_name: String,
    pub phone: String,
    /// Digits only.
    pub age: String,
    pub reason: String,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub phone: String,
    pub age: u32,
    pub reason: String,
    pub email: String,
    pub doctor_name: String,
    /// `pending`, `accepted` or `rejected`.
    pub status: String,
    pub serial_number: Option<u32>,
    pub appointment_time: Option<String>,
    pub appointment_duration: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            doctor_id: b.doctor_id,
            patient_name: b.patient_name,
            phone: b.phone,
            age: b.age,
            reason: b.reason,
            email: b.email,
            doctor_name: b.doctor_name,
            status: b.status.as_str().to_string(),
            serial_number: b.serial_number,
            appointment_time: b.appointment_time,
            appointment_duration: b.appointment_duration,
            created_at: b.created_at,
            accepted_at: b.accepted_at,
            rejected_at: b.rejected_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BookingStatsResponse {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl From<BookingStats> for BookingStatsResponse {
    fn from(s: BookingStats) -> Self {
        Self {
            pending: s.pending,
            accepted: s.accepted,
            rejected: s.rejected,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    pub stats: BookingStatsResponse,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Submit an appointment request to a doctor.
#[utoipa::path(
    post,
    path = "/doctors/{uid}/bookings",
    params(("uid" = Uuid, Path, description = "The doctor being booked.")),
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Request sent", body = BookingResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "No such doctor")
    )
)]
pub async fn create_booking_handler(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let form = BookingForm {
        patient_name: req.patient_name,
        phone: req.phone,
        age: req.age,
        reason: req.reason,
        email: req.email,
    };
    let new_booking = validate_booking(&form).map_err(invalid)?;

    let booking = state
        .db
        .create_booking(doctor_id, new_booking)
        .await
        .map_err(|e| port_failure("Failed to send appointment request", e))?;
    info!(%doctor_id, booking_id = %booking.id, "Booking requested");

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

/// The signed-in doctor's bookings, newest first, with per-status counts.
#[utoipa::path(
    get,
    path = "/me/bookings",
    responses(
        (status = 200, description = "Bookings and counts", body = BookingListResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_my_bookings_handler(
    State(state): State<Arc<AppState>>,
    Extension(DoctorId(doctor_id)): Extension<DoctorId>,
) -> Result<Json<BookingListResponse>, HandlerError> {
    let bookings = state
        .db
        .list_bookings_for_doctor(doctor_id)
        .await
        .map_err(|e| port_failure("Failed to load bookings", e))?;

    let stats = BookingStats::from_bookings(&bookings).into();
    Ok(Json(BookingListResponse {
        bookings: bookings.into_iter().map(BookingResponse::from).collect(),
        stats,
    }))
}

/// Accept a pending booking, assigning its serial number and time slot.
///
/// The patient is notified by SMS and email in the background.
#[utoipa::path(
    post,
    path = "/me/bookings/{id}/accept",
    params(("id" = Uuid, Path, description = "The booking to accept.")),
    responses(
        (status = 200, description = "Booking accepted", body = BookingResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such booking"),
        (status = 409, description = "Booking already processed")
    )
)]
pub async fn accept_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(DoctorId(doctor_id)): Extension<DoctorId>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, HandlerError> {
    let booking = state
        .db
        .accept_booking(doctor_id, booking_id, Utc::now())
        .await
        .map_err(|e| port_failure("Failed to accept booking", e))?;
    info!(
        %doctor_id,
        %booking_id,
        serial = ?booking.serial_number,
        "Booking accepted"
    );

    spawn_acceptance_notices(state.clone(), booking.clone());
    Ok(Json(booking.into()))
}

/// Reject a pending booking. No notification is sent.
#[utoipa::path(
    post,
    path = "/me/bookings/{id}/reject",
    params(("id" = Uuid, Path, description = "The booking to reject.")),
    responses(
        (status = 200, description = "Booking rejected", body = BookingResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such booking"),
        (status = 409, description = "Booking already processed")
    )
)]
pub async fn reject_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(DoctorId(doctor_id)): Extension<DoctorId>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, HandlerError> {
    let booking = state
        .db
        .reject_booking(doctor_id, booking_id, Utc::now())
        .await
        .map_err(|e| port_failure("Failed to reject booking", e))?;
    info!(%doctor_id, %booking_id, "Booking rejected");
    Ok(Json(booking.into()))
}

/// A single booking owned by the signed-in doctor.
#[utoipa::path(
    get,
    path = "/me/bookings/{id}",
    params(("id" = Uuid, Path, description = "The booking id.")),
    responses(
        (status = 200, description = "The booking", body = BookingResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such booking")
    )
)]
pub async fn get_my_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(DoctorId(doctor_id)): Extension<DoctorId>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, HandlerError> {
    let booking = state
        .db
        .get_booking(doctor_id, booking_id)
        .await
        .map_err(|e| port_failure("Failed to load booking", e))?;
    Ok(Json(booking.into()))
}
