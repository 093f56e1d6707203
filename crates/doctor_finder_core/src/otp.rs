//! crates/doctor_finder_core/src/otp.rs
//!
//! One-time code lifecycle: generation, identifier keys, expiry, resend
//! cooldown and verification.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::domain::OtpRecord;

pub const OTP_LENGTH: usize = 6;
pub const DEFAULT_OTP_TTL_SECS: i64 = 10 * 60;
pub const DEFAULT_RESEND_COOLDOWN_SECS: i64 = 60;

/// Generates a uniformly random 6-digit code with no leading zero.
pub fn generate_otp() -> String {
    generate_otp_with(&mut rand::thread_rng())
}

pub fn generate_otp_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100_000..=999_999u32).to_string()
}

/// Turns a phone number or email address into a storage key: lowercase
/// ASCII alphanumerics, everything else replaced by `_`.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Formats a local 11-digit number for the SMS gateway (+880 country code).
pub fn format_sms_phone(phone: &str) -> String {
    if phone.starts_with('0') {
        format!("+88{}", phone)
    } else {
        format!("+880{}", phone)
    }
}

/// Builds a fresh record for `identifier` valid for `ttl`.
pub fn new_record(identifier: &str, otp: String, now: DateTime<Utc>, ttl: Duration) -> OtpRecord {
    OtpRecord {
        identifier: identifier.to_string(),
        otp,
        created_at: now,
        expires_at: now + ttl,
    }
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Seconds a caller still has to wait before another code may be sent, if any.
pub fn resend_wait(
    existing: Option<&OtpRecord>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Option<i64> {
    let record = existing?;
    let ready_at = record.created_at + cooldown;
    if now < ready_at {
        // Round up so "0 seconds left" never blocks.
        let millis = (ready_at - now).num_milliseconds();
        Some((millis + 999) / 1000)
    } else {
        None
    }
}

/// Spells out how long a code stays valid, e.g. "10 minutes" or "90 seconds".
pub fn expiry_phrase(ttl: Duration) -> String {
    let secs = ttl.num_seconds();
    let (amount, unit) = if secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if amount == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", amount, unit)
    }
}

/// Whether a submitted code is well formed (exactly six ASCII digits).
pub fn is_well_formed(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// The code matched; the record should be consumed.
    Verified,
    /// The record has expired; it should be deleted.
    Expired,
    /// Wrong code; the record stays for another attempt.
    Mismatch,
}

/// Compares `submitted` against the stored record at time `now`.
pub fn check(record: &OtpRecord, submitted: &str, now: DateTime<Utc>) -> OtpCheck {
    if record.is_expired(now) {
        OtpCheck::Expired
    } else if record.otp == submitted.trim() {
        OtpCheck::Verified
    } else {
        OtpCheck::Mismatch
    }
}
