//! crates/doctor_finder_core/src/booking.rs
//!
//! The booking acceptance state machine and the sequential slot allocation
//! applied when a doctor accepts a request.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::domain::{AcceptanceEmail, Booking, BookingStatus, Doctor};

/// First slot of the day, in minutes after midnight (09:00).
pub const FIRST_SLOT_MINUTES: u32 = 9 * 60;
/// Length of one appointment slot.
pub const SLOT_LENGTH_MINUTES: u32 = 20;
pub const APPOINTMENT_DURATION: &str = "20 minutes";
/// Bangladesh Standard Time, UTC+06:00.
pub const DEFAULT_CLINIC_UTC_OFFSET_SECS: i32 = 6 * 60 * 60;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("This booking has already been processed.")]
    AlreadyProcessed(BookingStatus),
    #[error("A booking cannot be moved back to {0}.")]
    InvalidTarget(BookingStatus),
}

/// Checks that a booking currently in `from` may move to `to`.
///
/// Only `pending -> accepted` and `pending -> rejected` are allowed; both
/// targets are terminal.
pub fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), BookingError> {
    if from.is_terminal() {
        return Err(BookingError::AlreadyProcessed(from));
    }
    if !to.is_terminal() {
        return Err(BookingError::InvalidTarget(to));
    }
    Ok(())
}

/// The serial number, time slot and duration handed to an accepted booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub serial_number: u32,
    pub appointment_time: String,
    pub appointment_duration: String,
}

/// Computes the slot for the next acceptance given how many bookings the
/// doctor has already accepted.
pub fn assign_slot(accepted_count: usize) -> SlotAssignment {
    let serial_number = u32::try_from(accepted_count).unwrap_or(u32::MAX - 1) + 1;
    let (hour, minute) = slot_start(serial_number);
    SlotAssignment {
        serial_number,
        appointment_time: format_12h(hour, minute),
        appointment_duration: APPOINTMENT_DURATION.to_string(),
    }
}

/// Start of the slot for `serial_number` as `(hour, minute)` on a 24-hour clock.
/// Serials past the end of the day wrap around midnight.
pub fn slot_start(serial_number: u32) -> (u32, u32) {
    let offset = u64::from(serial_number.saturating_sub(1)) * u64::from(SLOT_LENGTH_MINUTES);
    let minutes = (u64::from(FIRST_SLOT_MINUTES) + offset) % u64::from(MINUTES_PER_DAY);
    // Fits: minutes < 1440.
    let minutes = minutes as u32;
    (minutes / 60, minutes % 60)
}

/// Formats a 24-hour clock time as `h:mm AM|PM`.
pub fn format_12h(hour: u32, minute: u32) -> String {
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    let meridiem = if hour >= 12 { "PM" } else { "AM" };
    format!("{}:{:02} {}", display_hour, minute, meridiem)
}

/// `Monday, October 19, 2026`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Text of the confirmation SMS sent to the patient.
pub fn acceptance_sms(booking: &Booking) -> String {
    format!(
        "Hello {}, your appointment with Dr. {} is confirmed.\nSerial: {}\nTime: {}",
        booking.patient_name,
        booking.doctor_name,
        booking
            .serial_number
            .map(|s| s.to_string())
            .unwrap_or_default(),
        booking.appointment_time.as_deref().unwrap_or_default(),
    )
}

/// Builds the acceptance email for a freshly accepted booking.
///
/// Dates are rendered in the offset of `now`, the clinic's local time.
/// Returns `None` when the booking has not been accepted or has no email.
pub fn acceptance_email(
    booking: &Booking,
    doctor: &Doctor,
    now: DateTime<FixedOffset>,
) -> Option<AcceptanceEmail> {
    if booking.status != BookingStatus::Accepted || booking.email.trim().is_empty() {
        return None;
    }
    let accepted_at = booking
        .accepted_at
        .map(|at| at.with_timezone(now.offset()))
        .unwrap_or(now);
    Some(AcceptanceEmail {
        patient_email: booking.email.clone(),
        patient_name: non_empty_or(&booking.patient_name, "Patient"),
        doctor_name: non_empty_or(&booking.doctor_name, "Doctor"),
        doctor_degree: doctor.degree.clone(),
        department: non_empty_or(&doctor.department, "General"),
        hospital: non_empty_or(&doctor.hospital, "Hospital"),
        appointment_date: long_date(now.date_naive()),
        appointment_time: booking.appointment_time.clone().unwrap_or_default(),
        appointment_duration: booking
            .appointment_duration
            .clone()
            .unwrap_or_else(|| APPOINTMENT_DURATION.to_string()),
        serial_number: booking
            .serial_number
            .map(|s| s.to_string())
            .unwrap_or_default(),
        accepted_at: accepted_at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
    })
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
