//! crates/doctor_finder_core/src/validation.rs
//!
//! Field checks for the signup, profile and booking forms. Each validator
//! reports the first rule a value breaks.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

use crate::domain::{DoctorProfileUpdate, NewBooking, NewDoctor};

pub const PHONE_DIGITS: usize = 11;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_DOCTOR_AGE: u32 = 18;
pub const MAX_DOCTOR_AGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

type FieldResult = Result<(), ValidationError>;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z\s.]+$").expect("name pattern compiles"))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

//=========================================================================================
// Individual fields
//=========================================================================================

pub fn validate_name(value: &str) -> FieldResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new("name", "Full name is required"));
    }
    if value.trim().chars().count() < 3 {
        return Err(ValidationError::new("name", "Name must be at least 3 characters"));
    }
    if !name_regex().is_match(value) {
        return Err(ValidationError::new(
            "name",
            "Name can only contain letters, spaces and dots",
        ));
    }
    Ok(())
}

pub fn validate_phone(value: &str) -> FieldResult {
    if value.is_empty() {
        return Err(ValidationError::new("phone", "Phone number is required"));
    }
    if !is_digits(value) {
        return Err(ValidationError::new("phone", "Phone must contain only digits"));
    }
    if value.len() != PHONE_DIGITS {
        return Err(ValidationError::new(
            "phone",
            "Phone number must be exactly 11 digits",
        ));
    }
    Ok(())
}

pub fn validate_email(value: &str) -> FieldResult {
    if value.is_empty() {
        return Err(ValidationError::new("email", "Email is required"));
    }
    if !email_regex().is_match(value) {
        return Err(ValidationError::new("email", "Please enter a valid email address"));
    }
    Ok(())
}

pub fn validate_password(value: &str) -> FieldResult {
    if value.is_empty() {
        return Err(ValidationError::new("password", "Password is required"));
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    Ok(())
}

pub fn validate_confirm_password(password: &str, confirm: &str) -> FieldResult {
    if confirm.is_empty() {
        return Err(ValidationError::new("confirmPassword", "Please confirm your password"));
    }
    if password != confirm {
        return Err(ValidationError::new("confirmPassword", "Passwords do not match"));
    }
    Ok(())
}

/// Required free-text field with a minimum trimmed length.
fn validate_text(
    field: &'static str,
    value: &str,
    min_len: usize,
    required_msg: &str,
    invalid_msg: &str,
) -> FieldResult {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, required_msg));
    }
    if trimmed.chars().count() < min_len {
        return Err(ValidationError::new(field, invalid_msg));
    }
    Ok(())
}

pub fn validate_department(value: &str) -> FieldResult {
    validate_text(
        "department",
        value,
        2,
        "Department/Specialty is required",
        "Please enter a valid department",
    )
}

pub fn validate_hospital(value: &str) -> FieldResult {
    validate_text(
        "hospital",
        value,
        3,
        "Hospital/Clinic name is required",
        "Please enter a valid hospital name",
    )
}

pub fn validate_degree(value: &str) -> FieldResult {
    validate_text(
        "degree",
        value,
        2,
        "Degree/Qualification is required",
        "Please enter a valid degree",
    )
}

pub fn validate_registration_number(value: &str) -> FieldResult {
    validate_text(
        "registrationNumber",
        value,
        4,
        "BMDC Registration number is required",
        "Please enter a valid registration number",
    )
}

pub fn validate_place(value: &str) -> FieldResult {
    validate_text(
        "place",
        value,
        3,
        "Chamber/Practice location is required",
        "Please enter a valid location",
    )
}

pub fn validate_appointment_time(value: &str) -> FieldResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new("appointmentTime", "Appointment time is required"));
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` date of birth and checks the doctor's age bounds.
pub fn validate_dob(value: &str, today: NaiveDate) -> Result<(NaiveDate, u32), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("dob", "Date of birth is required"));
    }
    let dob = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::new("dob", "Please enter a valid date of birth"))?;
    let age = age_on(dob, today)
        .ok_or_else(|| ValidationError::new("dob", "Please enter a valid date of birth"))?;
    if age < MIN_DOCTOR_AGE {
        return Err(ValidationError::new("dob", "You must be at least 18 years old"));
    }
    if age > MAX_DOCTOR_AGE {
        return Err(ValidationError::new("dob", "Please enter a valid date of birth"));
    }
    Ok((dob, age))
}

/// Whole years between `dob` and `today`; `None` for birth dates in the future.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

//=========================================================================================
// Password strength
//=========================================================================================

/// Scores a password from 0 to 5.
pub fn password_strength(password: &str) -> u8 {
    let len = password.chars().count();
    let mut score = 0;
    if len >= 6 {
        score += 1;
    }
    if len >= 8 {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
    {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if password.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c)) {
        score += 1;
    }
    score
}

pub fn strength_label(score: u8) -> &'static str {
    match score {
        0 | 1 => "Weak",
        2 => "Fair",
        3 => "Good",
        4 => "Strong",
        _ => "Very Strong",
    }
}

//=========================================================================================
// Whole forms
//=========================================================================================

/// Raw signup input from a doctor.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub department: String,
    pub hospital: String,
    pub degree: String,
    pub appointment_time: String,
    pub place: String,
    pub registration_number: String,
    pub dob: String,
}

/// Validates every signup field in form order and builds the doctor record.
pub fn validate_signup(form: &SignupForm, today: NaiveDate) -> Result<NewDoctor, ValidationError> {
    validate_name(&form.name)?;
    validate_phone(&form.phone)?;
    validate_email(&form.email)?;
    validate_password(&form.password)?;
    validate_confirm_password(&form.password, &form.confirm_password)?;
    validate_department(&form.department)?;
    validate_hospital(&form.hospital)?;
    validate_degree(&form.degree)?;
    validate_registration_number(&form.registration_number)?;
    validate_place(&form.place)?;
    let (dob, age) = validate_dob(&form.dob, today)?;
    validate_appointment_time(&form.appointment_time)?;

    Ok(NewDoctor {
        name: form.name.trim().to_string(),
        phone: form.phone.clone(),
        email: form.email.trim().to_lowercase(),
        department: form.department.trim().to_string(),
        hospital: form.hospital.trim().to_string(),
        degree: form.degree.trim().to_string(),
        appointment_time: form.appointment_time.trim().to_string(),
        place: form.place.trim().to_string(),
        registration_number: form.registration_number.trim().to_string(),
        dob,
        age,
    })
}

pub fn validate_profile_update(update: &DoctorProfileUpdate) -> Result<(), ValidationError> {
    validate_name(&update.name)?;
    validate_phone(&update.phone)?;
    validate_email(&update.email)?;
    validate_hospital(&update.hospital)?;
    validate_degree(&update.degree)?;
    validate_appointment_time(&update.appointment_time)?;
    validate_place(&update.place)?;
    Ok(())
}

/// Raw booking input from a patient.
#[derive(Debug, Clone, Default)]
pub struct BookingForm {
    pub patient_name: String,
    pub phone: String,
    pub age: String,
    pub reason: String,
    pub email: String,
}

const BOOKING_INCOMPLETE: &str = "Please fill all fields with valid information.";

pub fn validate_booking(form: &BookingForm) -> Result<NewBooking, ValidationError> {
    let email = form.email.trim();
    let required = [
        ("patientName", form.patient_name.trim()),
        ("phone", form.phone.trim()),
        ("age", form.age.trim()),
        ("reason", form.reason.trim()),
        ("email", email),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.is_empty()) {
        return Err(ValidationError::new(*field, BOOKING_INCOMPLETE));
    }
    if !email_regex().is_match(email) {
        return Err(ValidationError::new("email", BOOKING_INCOMPLETE));
    }
    if !is_digits(form.phone.trim()) {
        return Err(ValidationError::new("phone", "Phone must contain only digits"));
    }
    let age = form
        .age
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|_| is_digits(form.age.trim()))
        .ok_or_else(|| ValidationError::new("age", "Age must contain only digits"))?;

    Ok(NewBooking {
        patient_name: form.patient_name.trim().to_string(),
        phone: form.phone.trim().to_string(),
        age,
        reason: form.reason.trim().to_string(),
        email: email.to_string(),
    })
}
