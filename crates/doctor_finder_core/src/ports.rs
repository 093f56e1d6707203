//! crates/doctor_finder_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    AcceptanceEmail, Booking, ChatMessage, Doctor, DoctorCredentials, DoctorProfileUpdate,
    EmailQueueEntry, NewBooking, NewDoctor, OtpRecord,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The write lost against the current state of the record.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },
    /// The external service is not configured for this deployment.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Doctors ---
    /// Fails with `Conflict` when the email is already registered.
    async fn create_doctor(&self, doctor: NewDoctor, hashed_password: &str) -> PortResult<Doctor>;

    async fn get_doctor(&self, uid: Uuid) -> PortResult<Doctor>;

    async fn get_doctor_credentials_by_email(&self, email: &str) -> PortResult<DoctorCredentials>;

    async fn list_doctors(&self) -> PortResult<Vec<Doctor>>;

    async fn update_doctor_profile(
        &self,
        uid: Uuid,
        update: DoctorProfileUpdate,
    ) -> PortResult<Doctor>;

    /// Removes the doctor together with their bookings and auth sessions.
    async fn delete_doctor(&self, uid: Uuid) -> PortResult<()>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        doctor_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Bookings ---
    async fn create_booking(&self, doctor_id: Uuid, booking: NewBooking) -> PortResult<Booking>;

    async fn get_booking(&self, doctor_id: Uuid, booking_id: Uuid) -> PortResult<Booking>;

    /// Newest first.
    async fn list_bookings_for_doctor(&self, doctor_id: Uuid) -> PortResult<Vec<Booking>>;

    /// Atomically moves a pending booking to `accepted`, assigning the next serial
    /// number and time slot. Fails with `Conflict` if the booking is not pending.
    async fn accept_booking(
        &self,
        doctor_id: Uuid,
        booking_id: Uuid,
        accepted_at: DateTime<Utc>,
    ) -> PortResult<Booking>;

    /// Atomically moves a pending booking to `rejected`.
    /// Fails with `Conflict` if the booking is not pending.
    async fn reject_booking(
        &self,
        doctor_id: Uuid,
        booking_id: Uuid,
        rejected_at: DateTime<Utc>,
    ) -> PortResult<Booking>;

    // --- OTP verification ---
    /// Stores the record, replacing any earlier one for the same identifier
    /// unless that one was created less than `resend_cooldown` before
    /// `record.created_at`. The check and the write happen atomically; a
    /// refused write fails with `RateLimited`.
    async fn issue_otp(&self, record: OtpRecord, resend_cooldown: Duration) -> PortResult<()>;

    async fn get_otp(&self, identifier: &str) -> PortResult<Option<OtpRecord>>;

    async fn delete_otp(&self, identifier: &str) -> PortResult<()>;

    /// Deletes every record expired as of `now`, returning how many were removed.
    async fn purge_expired_otps(&self, now: DateTime<Utc>) -> PortResult<u64>;

    async fn mark_identifier_verified(
        &self,
        identifier: &str,
        verified_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Whether the identifier passed verification at or after `since`.
    async fn is_identifier_verified(
        &self,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> PortResult<bool>;

    // --- Email queue ---
    async fn enqueue_email(&self, to: &str, name: &str, otp: &str) -> PortResult<EmailQueueEntry>;

    async fn mark_email_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> PortResult<()>;

    async fn mark_email_failed(
        &self,
        id: Uuid,
        error: &str,
        failed_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Deletes entries created at or before `cutoff`, returning how many were removed.
    async fn purge_email_queue(&self, cutoff: DateTime<Utc>) -> PortResult<u64>;
}

#[async_trait]
pub trait SmsService: Send + Sync {
    /// Sends a text message to an E.164 formatted number.
    async fn send_sms(&self, to: &str, body: &str) -> PortResult<()>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    /// `expires_in` is a human readable validity such as "10 minutes".
    async fn send_otp_email(
        &self,
        to: &str,
        name: &str,
        otp: &str,
        expires_in: &str,
    ) -> PortResult<()>;

    async fn send_acceptance_email(&self, email: &AcceptanceEmail) -> PortResult<()>;
}

#[async_trait]
pub trait SymptomAssistantService: Send + Sync {
    /// Produces the assistant's reply to `message`, given the earlier turns.
    async fn reply(&self, history: &[ChatMessage], message: &str) -> PortResult<String>;
}
