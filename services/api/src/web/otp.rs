//! services/api/src/web/otp.rs
//!
//! Requesting and verifying one-time codes for a phone number (SMS) or an
//! email address (queued email).

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use doctor_finder_core::otp::{
    self, check, expiry_phrase, format_sms_phone, generate_otp, is_well_formed, new_record,
    sanitize_identifier, OtpCheck,
};
use doctor_finder_core::validation::{validate_email, validate_phone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::notifications::spawn_email_dispatch;
use crate::web::errors::{invalid, port_failure, HandlerError};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Sms,
    Email,
}

#[derive(Deserialize, ToSchema)]
pub struct RequestOtpRequest {
    pub channel: OtpChannel,
    /// An 11-digit phone number for `sms`, an address for `email`.
    pub destination: String,
    /// Used to greet the recipient.
    pub name: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpResponse {
    pub message: String,
    pub expires_at: DateTime<Utc>,
    /// Seconds until another code may be requested.
    pub resend_after_secs: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    pub destination: String,
    pub code: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyOtpResponse {
    pub verified: bool,
    pub message: String,
}

fn otp_sms_body(name: &str, code: &str, expires_in: &str) -> String {
    format!(
        "Hello {}, your Doctor Finder verification code is {}. It expires in {}.",
        name, code, expires_in
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Send a fresh verification code.
///
/// A new code replaces the previous one. Requests within the cooldown window
/// of the last code are refused. A code whose SMS could not be sent is
/// discarded so the caller may retry at once.
#[utoipa::path(
    post,
    path = "/otp/request",
    request_body = RequestOtpRequest,
    responses(
        (status = 200, description = "Code sent", body = RequestOtpResponse),
        (status = 400, description = "Invalid phone number or email"),
        (status = 429, description = "Requested again too soon"),
        (status = 502, description = "The SMS gateway refused the message")
    )
)]
pub async fn request_otp_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>, HandlerError> {
    let destination = req.destination.trim().to_string();
    match req.channel {
        OtpChannel::Sms => validate_phone(&destination).map_err(invalid)?,
        OtpChannel::Email => validate_email(&destination).map_err(invalid)?,
    }
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("User")
        .to_string();

    let identifier = sanitize_identifier(&destination);
    let now = Utc::now();
    let policy = &state.otp_policy;

    let code = generate_otp();
    let record = new_record(&identifier, code.clone(), now, policy.ttl);
    let expires_at = record.expires_at;
    state
        .db
        .issue_otp(record, policy.resend_cooldown)
        .await
        .map_err(|e| port_failure("Failed to send verification code", e))?;

    let message = match req.channel {
        OtpChannel::Sms => {
            let body = otp_sms_body(&name, &code, &expiry_phrase(policy.ttl));
            if let Err(e) = state.sms.send_sms(&format_sms_phone(&destination), &body).await {
                error!("Verification SMS failed: {}", e);
                // An undelivered code must not hold the resend cooldown.
                if let Err(e) = state.db.delete_otp(&identifier).await {
                    error!(identifier = %identifier, "Failed to discard undelivered code: {}", e);
                }
                return Err((
                    StatusCode::BAD_GATEWAY,
                    "Failed to send SMS. Please try again.".to_string(),
                ));
            }
            format!(
                "A {}-digit verification code has been sent to {} via SMS.",
                otp::OTP_LENGTH,
                destination
            )
        }
        OtpChannel::Email => {
            let entry = state
                .db
                .enqueue_email(&destination, &name, &code)
                .await
                .map_err(|e| port_failure("Failed to send verification code", e))?;
            spawn_email_dispatch(state.clone(), entry);
            format!(
                "A {}-digit verification code has been sent to {}.",
                otp::OTP_LENGTH,
                destination
            )
        }
    };
    info!(identifier = %identifier, channel = ?req.channel, "Verification code issued");

    Ok(Json(RequestOtpResponse {
        message,
        expires_at,
        resend_after_secs: policy.resend_cooldown.num_seconds(),
    }))
}

/// Check a submitted code against the one on record.
#[utoipa::path(
    post,
    path = "/otp/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Verified", body = VerifyOtpResponse),
        (status = 400, description = "Malformed, unknown or wrong code"),
        (status = 410, description = "Code expired")
    )
)]
pub async fn verify_otp_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, HandlerError> {
    let code = req.code.trim();
    if !is_well_formed(code) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please enter a 6-digit code".to_string(),
        ));
    }

    let identifier = sanitize_identifier(&req.destination);
    let now = Utc::now();
    let record = state
        .db
        .get_otp(&identifier)
        .await
        .map_err(|e| port_failure("Failed to verify code", e))?
        .ok_or((
            StatusCode::BAD_REQUEST,
            "No verification code requested. Please request a new code.".to_string(),
        ))?;

    match check(&record, code, now) {
        OtpCheck::Mismatch => Err((
            StatusCode::BAD_REQUEST,
            "Invalid verification code. Please try again.".to_string(),
        )),
        OtpCheck::Expired => {
            state
                .db
                .delete_otp(&identifier)
                .await
                .map_err(|e| port_failure("Failed to verify code", e))?;
            Err((
                StatusCode::GONE,
                "Verification code has expired. Please request a new one.".to_string(),
            ))
        }
        OtpCheck::Verified => {
            state
                .db
                .delete_otp(&identifier)
                .await
                .map_err(|e| port_failure("Failed to verify code", e))?;
            state
                .db
                .mark_identifier_verified(&identifier, now)
                .await
                .map_err(|e| port_failure("Failed to verify code", e))?;
            info!(identifier = %identifier, "Identifier verified");
            Ok(Json(VerifyOtpResponse {
                verified: true,
                message: "Verified successfully!".to_string(),
            }))
        }
    }
}
