//! In-memory stand-ins for the ports, and helpers for driving the router.

#![allow(dead_code)]

use api_lib::config::OtpPolicy;
use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use doctor_finder_core::booking::{assign_slot, ensure_transition, DEFAULT_CLINIC_UTC_OFFSET_SECS};
use doctor_finder_core::domain::{
    AcceptanceEmail, Booking, BookingStatus, ChatMessage, Doctor, DoctorCredentials,
    DoctorProfileUpdate, DoctorStatus, EmailQueueEntry, EmailStatus, NewBooking, NewDoctor,
    OtpRecord,
};
use doctor_finder_core::otp::resend_wait;
use doctor_finder_core::ports::{
    DatabaseService, EmailService, PortError, PortResult, SmsService, SymptomAssistantService,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// Database
//=========================================================================================

#[derive(Default)]
struct Tables {
    doctors: Vec<(Doctor, String)>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    bookings: Vec<Booking>,
    otps: HashMap<String, OtpRecord>,
    verified: HashMap<String, DateTime<Utc>>,
    emails: Vec<EmailQueueEntry>,
}

#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
}

impl InMemoryDb {
    pub fn insert_doctor(&self, doctor: Doctor, hashed_password: &str) {
        let mut t = self.tables.lock().unwrap();
        t.doctors.push((doctor, hashed_password.to_string()));
    }

    pub fn set_doctor_status(&self, uid: Uuid, status: DoctorStatus) {
        let mut t = self.tables.lock().unwrap();
        if let Some((doctor, _)) = t.doctors.iter_mut().find(|(d, _)| d.uid == uid) {
            doctor.status = status;
        }
    }

    pub fn insert_otp(&self, record: OtpRecord) {
        let mut t = self.tables.lock().unwrap();
        t.otps.insert(record.identifier.clone(), record);
    }

    pub fn otp(&self, identifier: &str) -> Option<OtpRecord> {
        self.tables.lock().unwrap().otps.get(identifier).cloned()
    }

    pub fn verified_at(&self, identifier: &str) -> Option<DateTime<Utc>> {
        self.tables.lock().unwrap().verified.get(identifier).copied()
    }

    pub fn insert_email(&self, entry: EmailQueueEntry) {
        self.tables.lock().unwrap().emails.push(entry);
    }

    pub fn emails(&self) -> Vec<EmailQueueEntry> {
        self.tables.lock().unwrap().emails.clone()
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.tables.lock().unwrap().bookings.clone()
    }

    fn transition(
        &self,
        doctor_id: Uuid,
        booking_id: Uuid,
        target: BookingStatus,
        at: DateTime<Utc>,
    ) -> PortResult<Booking> {
        let mut t = self.tables.lock().unwrap();
        if !t.doctors.iter().any(|(d, _)| d.uid == doctor_id) {
            return Err(PortError::NotFound(format!("Doctor {} not found", doctor_id)));
        }
        let accepted = t
            .bookings
            .iter()
            .filter(|b| b.doctor_id == doctor_id && b.status == BookingStatus::Accepted)
            .count();
        let booking = t
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id && b.doctor_id == doctor_id)
            .ok_or_else(|| PortError::NotFound(format!("Booking {} not found", booking_id)))?;
        ensure_transition(booking.status, target).map_err(|e| PortError::Conflict(e.to_string()))?;

        booking.status = target;
        if target == BookingStatus::Accepted {
            let slot = assign_slot(accepted);
            booking.serial_number = Some(slot.serial_number);
            booking.appointment_time = Some(slot.appointment_time);
            booking.appointment_duration = Some(slot.appointment_duration);
            booking.accepted_at = Some(at);
        } else {
            booking.rejected_at = Some(at);
        }
        Ok(booking.clone())
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_doctor(&self, doctor: NewDoctor, hashed_password: &str) -> PortResult<Doctor> {
        let mut t = self.tables.lock().unwrap();
        if t.doctors.iter().any(|(d, _)| d.email == doctor.email) {
            return Err(PortError::Conflict(format!(
                "A doctor with email {} already exists",
                doctor.email
            )));
        }
        let created = Doctor {
            uid: Uuid::new_v4(),
            name: doctor.name,
            phone: doctor.phone,
            email: doctor.email,
            department: doctor.department,
            hospital: doctor.hospital,
            degree: doctor.degree,
            appointment_time: doctor.appointment_time,
            place: doctor.place,
            registration_number: doctor.registration_number,
            dob: doctor.dob,
            age: doctor.age,
            role: "doctor".to_string(),
            status: DoctorStatus::Active,
            created_at: Utc::now(),
        };
        t.doctors.push((created.clone(), hashed_password.to_string()));
        Ok(created)
    }

    async fn get_doctor(&self, uid: Uuid) -> PortResult<Doctor> {
        let t = self.tables.lock().unwrap();
        t.doctors
            .iter()
            .find(|(d, _)| d.uid == uid)
            .map(|(d, _)| d.clone())
            .ok_or_else(|| PortError::NotFound(format!("Doctor {} not found", uid)))
    }

    async fn get_doctor_credentials_by_email(&self, email: &str) -> PortResult<DoctorCredentials> {
        let wanted = email.trim().to_lowercase();
        let t = self.tables.lock().unwrap();
        t.doctors
            .iter()
            .find(|(d, _)| d.email == wanted)
            .map(|(d, hash)| DoctorCredentials {
                uid: d.uid,
                email: d.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("Doctor {} not found", email)))
    }

    async fn list_doctors(&self) -> PortResult<Vec<Doctor>> {
        let t = self.tables.lock().unwrap();
        let mut doctors: Vec<Doctor> = t
            .doctors
            .iter()
            .filter(|(d, _)| d.status == DoctorStatus::Active)
            .map(|(d, _)| d.clone())
            .collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn update_doctor_profile(
        &self,
        uid: Uuid,
        update: DoctorProfileUpdate,
    ) -> PortResult<Doctor> {
        let mut t = self.tables.lock().unwrap();
        let email = update.email.trim().to_lowercase();
        if t.doctors.iter().any(|(d, _)| d.uid != uid && d.email == email) {
            return Err(PortError::Conflict(format!("Email {} is already in use", email)));
        }
        let (doctor, _) = t
            .doctors
            .iter_mut()
            .find(|(d, _)| d.uid == uid)
            .ok_or_else(|| PortError::NotFound(format!("Doctor {} not found", uid)))?;
        doctor.name = update.name;
        doctor.phone = update.phone;
        doctor.email = email;
        doctor.hospital = update.hospital;
        doctor.degree = update.degree;
        doctor.appointment_time = update.appointment_time;
        doctor.place = update.place;
        Ok(doctor.clone())
    }

    async fn delete_doctor(&self, uid: Uuid) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        let before = t.doctors.len();
        t.doctors.retain(|(d, _)| d.uid != uid);
        if t.doctors.len() == before {
            return Err(PortError::NotFound(format!("Doctor {} not found", uid)));
        }
        t.bookings.retain(|b| b.doctor_id != uid);
        t.sessions.retain(|_, (doctor_id, _)| *doctor_id != uid);
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        doctor_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        t.sessions
            .insert(session_id.to_string(), (doctor_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let t = self.tables.lock().unwrap();
        match t.sessions.get(session_id) {
            Some((doctor_id, expires_at)) if *expires_at > Utc::now() => Ok(*doctor_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn create_booking(&self, doctor_id: Uuid, booking: NewBooking) -> PortResult<Booking> {
        let mut t = self.tables.lock().unwrap();
        let doctor_name = t
            .doctors
            .iter()
            .find(|(d, _)| d.uid == doctor_id)
            .map(|(d, _)| d.name.clone())
            .ok_or_else(|| PortError::NotFound(format!("Doctor {} not found", doctor_id)))?;
        let created = Booking {
            id: Uuid::new_v4(),
            doctor_id,
            patient_name: booking.patient_name,
            phone: booking.phone,
            age: booking.age,
            reason: booking.reason,
            email: booking.email,
            doctor_name,
            status: BookingStatus::Pending,
            serial_number: None,
            appointment_time: None,
            appointment_duration: None,
            created_at: Utc::now(),
            accepted_at: None,
            rejected_at: None,
        };
        t.bookings.push(created.clone());
        Ok(created)
    }

    async fn get_booking(&self, doctor_id: Uuid, booking_id: Uuid) -> PortResult<Booking> {
        let t = self.tables.lock().unwrap();
        t.bookings
            .iter()
            .find(|b| b.id == booking_id && b.doctor_id == doctor_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Booking {} not found", booking_id)))
    }

    async fn list_bookings_for_doctor(&self, doctor_id: Uuid) -> PortResult<Vec<Booking>> {
        let t = self.tables.lock().unwrap();
        let mut bookings: Vec<Booking> = t
            .bookings
            .iter()
            .rev()
            .filter(|b| b.doctor_id == doctor_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn accept_booking(
        &self,
        doctor_id: Uuid,
        booking_id: Uuid,
        accepted_at: DateTime<Utc>,
    ) -> PortResult<Booking> {
        self.transition(doctor_id, booking_id, BookingStatus::Accepted, accepted_at)
    }

    async fn reject_booking(
        &self,
        doctor_id: Uuid,
        booking_id: Uuid,
        rejected_at: DateTime<Utc>,
    ) -> PortResult<Booking> {
        self.transition(doctor_id, booking_id, BookingStatus::Rejected, rejected_at)
    }

    async fn issue_otp(&self, record: OtpRecord, resend_cooldown: Duration) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        let existing = t.otps.get(&record.identifier);
        if let Some(retry_after_secs) = resend_wait(existing, record.created_at, resend_cooldown) {
            return Err(PortError::RateLimited { retry_after_secs });
        }
        t.otps.insert(record.identifier.clone(), record);
        Ok(())
    }

    async fn get_otp(&self, identifier: &str) -> PortResult<Option<OtpRecord>> {
        Ok(self.otp(identifier))
    }

    async fn delete_otp(&self, identifier: &str) -> PortResult<()> {
        self.tables.lock().unwrap().otps.remove(identifier);
        Ok(())
    }

    async fn purge_expired_otps(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let mut t = self.tables.lock().unwrap();
        let before = t.otps.len();
        t.otps.retain(|_, r| r.expires_at > now);
        Ok((before - t.otps.len()) as u64)
    }

    async fn mark_identifier_verified(
        &self,
        identifier: &str,
        verified_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        t.verified.insert(identifier.to_string(), verified_at);
        Ok(())
    }

    async fn is_identifier_verified(
        &self,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> PortResult<bool> {
        Ok(self
            .verified_at(identifier)
            .is_some_and(|verified_at| verified_at >= since))
    }

    async fn enqueue_email(&self, to: &str, name: &str, otp: &str) -> PortResult<EmailQueueEntry> {
        let entry = EmailQueueEntry {
            id: Uuid::new_v4(),
            to: to.to_string(),
            name: name.to_string(),
            otp: otp.to_string(),
            status: EmailStatus::Pending,
            error: None,
            created_at: Utc::now(),
            sent_at: None,
            failed_at: None,
        };
        self.insert_email(entry.clone());
        Ok(entry)
    }

    async fn mark_email_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        let entry = t
            .emails
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Email {} not found", id)))?;
        entry.status = EmailStatus::Sent;
        entry.sent_at = Some(sent_at);
        Ok(())
    }

    async fn mark_email_failed(
        &self,
        id: Uuid,
        error: &str,
        failed_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut t = self.tables.lock().unwrap();
        let entry = t
            .emails
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Email {} not found", id)))?;
        entry.status = EmailStatus::Failed;
        entry.error = Some(error.to_string());
        entry.failed_at = Some(failed_at);
        Ok(())
    }

    async fn purge_email_queue(&self, cutoff: DateTime<Utc>) -> PortResult<u64> {
        let mut t = self.tables.lock().unwrap();
        let before = t.emails.len();
        t.emails.retain(|e| e.created_at > cutoff);
        Ok((before - t.emails.len()) as u64)
    }
}

//=========================================================================================
// Outbound messaging
//=========================================================================================

#[derive(Default)]
pub struct RecordingSms {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingSms {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsService for RecordingSms {
    async fn send_sms(&self, to: &str, body: &str) -> PortResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("gateway returned 500".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEmail {
    /// `(to, name, otp, expires_in)` for every verification email sent.
    pub otp_emails: Mutex<Vec<(String, String, String, String)>>,
    pub acceptance_emails: Mutex<Vec<AcceptanceEmail>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl EmailService for RecordingEmail {
    async fn send_otp_email(
        &self,
        to: &str,
        name: &str,
        otp: &str,
        expires_in: &str,
    ) -> PortResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("relay returned 400".to_string()));
        }
        self.otp_emails.lock().unwrap().push((
            to.to_string(),
            name.to_string(),
            otp.to_string(),
            expires_in.to_string(),
        ));
        Ok(())
    }

    async fn send_acceptance_email(&self, email: &AcceptanceEmail) -> PortResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("relay returned 400".to_string()));
        }
        self.acceptance_emails.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Answers every question with a fixed result and remembers what it was asked.
pub struct ScriptedAssistant {
    pub answer: PortResult<String>,
    pub seen: Mutex<Vec<(Vec<ChatMessage>, String)>>,
}

impl ScriptedAssistant {
    pub fn replying(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: PortError) -> Self {
        Self {
            answer: Err(error),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SymptomAssistantService for ScriptedAssistant {
    async fn reply(&self, history: &[ChatMessage], message: &str) -> PortResult<String> {
        self.seen
            .lock()
            .unwrap()
            .push((history.to_vec(), message.to_string()));
        self.answer.clone()
    }
}

//=========================================================================================
// Test application
//=========================================================================================

pub struct TestApp {
    pub state: Arc<AppState>,
    pub db: Arc<InMemoryDb>,
    pub sms: Arc<RecordingSms>,
    pub email: Arc<RecordingEmail>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_assistant(Arc::new(ScriptedAssistant::replying(
            "Please consult a General Physician.",
        )))
    }

    pub fn with_assistant(assistant: Arc<dyn SymptomAssistantService>) -> Self {
        Self::build(assistant, OtpPolicy::default())
    }

    pub fn with_policy(otp_policy: OtpPolicy) -> Self {
        Self::build(
            Arc::new(ScriptedAssistant::replying("Please consult a General Physician.")),
            otp_policy,
        )
    }

    fn build(assistant: Arc<dyn SymptomAssistantService>, otp_policy: OtpPolicy) -> Self {
        let db = Arc::new(InMemoryDb::default());
        let sms = Arc::new(RecordingSms::default());
        let email = Arc::new(RecordingEmail::default());
        let state = Arc::new(AppState {
            db: db.clone(),
            sms: sms.clone(),
            email: email.clone(),
            assistant,
            otp_policy,
            clinic_offset: FixedOffset::east_opt(DEFAULT_CLINIC_UTC_OFFSET_SECS).unwrap(),
        });
        Self {
            state,
            db,
            sms,
            email,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Stores an active doctor directly, bypassing signup.
    pub fn seed_doctor(&self, name: &str, department: &str, hospital: &str) -> Doctor {
        let doctor = Doctor {
            uid: Uuid::new_v4(),
            name: name.to_string(),
            phone: "01712345678".to_string(),
            email: format!(
                "{}@example.com",
                name.to_lowercase().replace(|c: char| !c.is_ascii_alphanumeric(), "")
            ),
            department: department.to_string(),
            hospital: hospital.to_string(),
            degree: "MBBS, FCPS".to_string(),
            appointment_time: "5:30 PM".to_string(),
            place: "Dhaka".to_string(),
            registration_number: "A-12345".to_string(),
            dob: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            age: 46,
            role: "doctor".to_string(),
            status: DoctorStatus::Active,
            created_at: Utc::now(),
        };
        self.db.insert_doctor(doctor.clone(), "not-a-real-hash");
        doctor
    }

    /// Opens an auth session for `doctor_id` and returns its id.
    pub async fn login_as(&self, doctor_id: Uuid) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.db
            .create_auth_session(&session_id, doctor_id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        session_id
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send_to(self.router(), request).await
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> TestResponse {
        self.send(request("GET", uri, None, session)).await
    }

    pub async fn post(&self, uri: &str, body: Value, session: Option<&str>) -> TestResponse {
        self.send(request("POST", uri, Some(body), session)).await
    }
}

/// Drives one request through `router`. Usable from spawned tasks.
pub async fn send_to(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The session id carried by a `Set-Cookie` header, if any.
    pub fn session_cookie(&self) -> Option<String> {
        let cookie = self.headers.get(header::SET_COOKIE)?.to_str().ok()?;
        cookie
            .split(';')
            .next()?
            .strip_prefix("session=")
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

pub fn request(method: &str, uri: &str, body: Option<Value>, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = session {
        builder = builder.header(header::COOKIE, format!("session={}", id));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Polls `condition` until it holds, giving spawned tasks a chance to run.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
