//! services/api/src/notifications.rs
//!
//! Fire-and-forget delivery of booking confirmations and queued verification
//! emails. Failures are logged and never propagate to the request that
//! triggered them.

use chrono::Utc;
use doctor_finder_core::booking::{acceptance_email, acceptance_sms};
use doctor_finder_core::domain::{Booking, EmailQueueEntry};
use doctor_finder_core::otp::{expiry_phrase, format_sms_phone};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::web::state::AppState;

/// Sends the acceptance SMS and email for `booking` on a background task.
pub fn spawn_acceptance_notices(state: Arc<AppState>, booking: Booking) -> JoinHandle<()> {
    tokio::spawn(async move { notify_acceptance(&state, &booking).await })
}

pub async fn notify_acceptance(state: &AppState, booking: &Booking) {
    let sms_body = acceptance_sms(booking);
    match state
        .sms
        .send_sms(&format_sms_phone(&booking.phone), &sms_body)
        .await
    {
        Ok(()) => info!(booking_id = %booking.id, "Acceptance SMS sent"),
        Err(e) => warn!(booking_id = %booking.id, "Acceptance SMS failed: {}", e),
    }

    let doctor = match state.db.get_doctor(booking.doctor_id).await {
        Ok(doctor) => doctor,
        Err(e) => {
            warn!(booking_id = %booking.id, "Skipping acceptance email, doctor lookup failed: {}", e);
            return;
        }
    };
    let now = Utc::now().with_timezone(&state.clinic_offset);
    let Some(email) = acceptance_email(booking, &doctor, now) else {
        return;
    };
    match state.email.send_acceptance_email(&email).await {
        Ok(()) => info!(booking_id = %booking.id, "Acceptance email sent"),
        Err(e) => warn!(booking_id = %booking.id, "Acceptance email failed: {}", e),
    }
}

/// Delivers a queued verification email on a background task.
pub fn spawn_email_dispatch(state: Arc<AppState>, entry: EmailQueueEntry) -> JoinHandle<()> {
    tokio::spawn(async move { dispatch_queued_email(&state, &entry).await })
}

/// Sends one queued email and records the outcome on the queue entry.
pub async fn dispatch_queued_email(state: &AppState, entry: &EmailQueueEntry) {
    let expires_in = expiry_phrase(state.otp_policy.ttl);
    let outcome = state
        .email
        .send_otp_email(&entry.to, &entry.name, &entry.otp, &expires_in)
        .await;

    let recorded = match outcome {
        Ok(()) => {
            info!(email_id = %entry.id, "OTP email sent");
            state.db.mark_email_sent(entry.id, Utc::now()).await
        }
        Err(e) => {
            error!(email_id = %entry.id, "OTP email send error: {}", e);
            state
                .db
                .mark_email_failed(entry.id, &e.to_string(), Utc::now())
                .await
        }
    };
    if let Err(e) = recorded {
        error!(email_id = %entry.id, "Failed to record email status: {}", e);
    }
}
