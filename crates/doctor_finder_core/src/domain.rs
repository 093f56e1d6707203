//! crates/doctor_finder_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Returned when a stored status string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

//=========================================================================================
// Doctors
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorStatus {
    Active,
    Inactive,
}

impl DoctorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoctorStatus::Active => "active",
            DoctorStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for DoctorStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(DoctorStatus::Active),
            "inactive" => Ok(DoctorStatus::Inactive),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A registered doctor as patients and the doctor themself see it.
#[derive(Debug, Clone)]
pub struct Doctor {
    pub uid: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub department: String,
    pub hospital: String,
    pub degree: String,
    /// Free-text chamber hours chosen at signup, e.g. "5:30 PM".
    pub appointment_time: String,
    pub place: String,
    pub registration_number: String,
    pub dob: NaiveDate,
    pub age: u32,
    pub role: String,
    pub status: DoctorStatus,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create a doctor row at signup.
#[derive(Debug, Clone)]
pub struct NewDoctor {
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
}

/// The profile fields a doctor may edit after signup.
#[derive(Debug, Clone)]
pub struct DoctorProfileUpdate {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub hospital: String,
    pub degree: String,
    pub appointment_time: String,
    pub place: String,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct DoctorCredentials {
    pub uid: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Bookings
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
        }
    }

    /// Accepted and rejected bookings never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "accepted" => Ok(BookingStatus::Accepted),
            "rejected" => Ok(BookingStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A patient's appointment request, stored under the doctor it was sent to.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub phone: String,
    pub age: u32,
    pub reason: String,
    pub email: String,
    pub doctor_name: String,
    pub status: BookingStatus,
    pub serial_number: Option<u32>,
    pub appointment_time: Option<String>,
    pub appointment_duration: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

/// A booking request as submitted by a patient.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub patient_name: String,
    pub phone: String,
    pub age: u32,
    pub reason: String,
    pub email: String,
}

/// Per-status tallies shown above a doctor's booking list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingStats {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl BookingStats {
    pub fn from_bookings(bookings: &[Booking]) -> Self {
        bookings.iter().fold(Self::default(), |mut stats, b| {
            match b.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Accepted => stats.accepted += 1,
                BookingStatus::Rejected => stats.rejected += 1,
            }
            stats
        })
    }
}

//=========================================================================================
// Verification and notification records
//=========================================================================================

/// A one-time code waiting to be verified, keyed by a sanitized identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub identifier: String,
    pub otp: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }
}

impl FromStr for EmailStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EmailStatus::Pending),
            "sent" => Ok(EmailStatus::Sent),
            "failed" => Ok(EmailStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// An outgoing verification email and its delivery state.
#[derive(Debug, Clone)]
pub struct EmailQueueEntry {
    pub id: Uuid,
    pub to: String,
    pub name: String,
    pub otp: String,
    pub status: EmailStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

/// Template parameters for the "your booking was accepted" email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceEmail {
    pub patient_email: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub doctor_degree: String,
    pub department: String,
    pub hospital: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub appointment_duration: String,
    pub serial_number: String,
    pub accepted_at: String,
}

//=========================================================================================
// Assistant chat
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single turn in the symptom assistant conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}
