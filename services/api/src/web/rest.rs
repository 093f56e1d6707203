//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification and the router that
//! wires every REST handler to its path.

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::web::assistant::{self, ChatRequest, ChatResponse, ChatTurn, ChatTurnRole};
use crate::web::auth::{
    self, AuthResponse, LoginRequest, SignupRequest, SignupResponse,
};
use crate::web::bookings::{
    self, BookingListResponse, BookingResponse, BookingStatsResponse, CreateBookingRequest,
};
use crate::web::doctors::{self, DoctorResponse, UpdateProfileRequest};
use crate::web::middleware::require_auth;
use crate::web::otp::{
    self, OtpChannel, RequestOtpRequest, RequestOtpResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        otp::request_otp_handler,
        otp::verify_otp_handler,
        doctors::list_doctors_handler,
        doctors::get_doctor_handler,
        doctors::list_departments_handler,
        doctors::list_hospitals_handler,
        doctors::get_profile_handler,
        doctors::update_profile_handler,
        doctors::delete_account_handler,
        bookings::create_booking_handler,
        bookings::list_my_bookings_handler,
        bookings::get_my_booking_handler,
        bookings::accept_booking_handler,
        bookings::reject_booking_handler,
        assistant::chat_handler,
    ),
    components(
        schemas(
            SignupRequest, SignupResponse, LoginRequest, AuthResponse,
            OtpChannel, RequestOtpRequest, RequestOtpResponse, VerifyOtpRequest, VerifyOtpResponse,
            DoctorResponse, UpdateProfileRequest,
            CreateBookingRequest, BookingResponse, BookingStatsResponse, BookingListResponse,
            ChatRequest, ChatResponse, ChatTurn, ChatTurnRole,
        )
    ),
    tags(
        (name = "Doctor Finder API", description = "Doctor directory, appointment bookings and the symptom assistant.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the API router. CORS and Swagger UI are layered on by the binary.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/otp/request", post(otp::request_otp_handler))
        .route("/otp/verify", post(otp::verify_otp_handler))
        .route("/doctors", get(doctors::list_doctors_handler))
        .route("/doctors/{uid}", get(doctors::get_doctor_handler))
        .route("/doctors/{uid}/bookings", post(bookings::create_booking_handler))
        .route("/departments", get(doctors::list_departments_handler))
        .route("/hospitals", get(doctors::list_hospitals_handler))
        .route("/assistant/chat", post(assistant::chat_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/me",
            get(doctors::get_profile_handler)
                .put(doctors::update_profile_handler)
                .delete(doctors::delete_account_handler),
        )
        .route("/me/bookings", get(bookings::list_my_bookings_handler))
        .route("/me/bookings/{id}", get(bookings::get_my_booking_handler))
        .route("/me/bookings/{id}/accept", post(bookings::accept_booking_handler))
        .route("/me/bookings/{id}/reject", post(bookings::reject_booking_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
