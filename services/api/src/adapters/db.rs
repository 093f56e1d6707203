//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use doctor_finder_core::booking::{assign_slot, ensure_transition};
use doctor_finder_core::domain::{
    Booking, BookingStatus, Doctor, DoctorCredentials, DoctorProfileUpdate, EmailQueueEntry,
    EmailStatus, NewBooking, NewDoctor, OtpRecord,
};
use doctor_finder_core::otp::resend_wait;
use doctor_finder_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("Corrupt {} row: {}", what, detail))
}

const DOCTOR_COLUMNS: &str = "uid, name, phone, email, department, hospital, degree, \
     appointment_time, place, registration_number, dob, age, role, status, created_at";

const BOOKING_COLUMNS: &str = "id, doctor_id, patient_name, phone, age, reason, email, \
     doctor_name, status, serial_number, appointment_time, appointment_duration, \
     created_at, accepted_at, rejected_at";

const EMAIL_COLUMNS: &str =
    "id, recipient, name, otp, status, error, created_at, sent_at, failed_at";

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DoctorRecord {
    uid: Uuid,
    name: String,
    phone: String,
    email: String,
    department: String,
    hospital: String,
    degree: String,
    appointment_time: String,
    place: String,
    registration_number: String,
    dob: NaiveDate,
    age: i32,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl DoctorRecord {
    fn to_domain(self) -> PortResult<Doctor> {
        Ok(Doctor {
            uid: self.uid,
            name: self.name,
            phone: self.phone,
            email: self.email,
            department: self.department,
            hospital: self.hospital,
            degree: self.degree,
            appointment_time: self.appointment_time,
            place: self.place,
            registration_number: self.registration_number,
            dob: self.dob,
            age: u32::try_from(self.age).map_err(|e| corrupt("doctor", e))?,
            role: self.role,
            status: self.status.parse().map_err(|e| corrupt("doctor", e))?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    uid: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct BookingRecord {
    id: Uuid,
    doctor_id: Uuid,
    patient_name: String,
    phone: String,
    age: i32,
    reason: String,
    email: String,
    doctor_name: String,
    status: String,
    serial_number: Option<i32>,
    appointment_time: Option<String>,
    appointment_duration: Option<String>,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
}
impl BookingRecord {
    fn to_domain(self) -> PortResult<Booking> {
        Ok(Booking {
            id: self.id,
            doctor_id: self.doctor_id,
            patient_name: self.patient_name,
            phone: self.phone,
            age: u32::try_from(self.age).map_err(|e| corrupt("booking", e))?,
            reason: self.reason,
            email: self.email,
            doctor_name: self.doctor_name,
            status: self.status.parse().map_err(|e| corrupt("booking", e))?,
            serial_number: self
                .serial_number
                .map(u32::try_from)
                .transpose()
                .map_err(|e| corrupt("booking", e))?,
            appointment_time: self.appointment_time,
            appointment_duration: self.appointment_duration,
            created_at: self.created_at,
            accepted_at: self.accepted_at,
            rejected_at: self.rejected_at,
        })
    }
}

#[derive(FromRow)]
struct OtpRow {
    identifier: String,
    otp: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}
impl OtpRow {
    fn to_domain(self) -> OtpRecord {
        OtpRecord {
            identifier: self.identifier,
            otp: self.otp,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct EmailQueueRecord {
    id: Uuid,
    recipient: String,
    name: String,
    otp: String,
    status: String,
    error: Option<String>,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
}
impl EmailQueueRecord {
    fn to_domain(self) -> PortResult<EmailQueueEntry> {
        Ok(EmailQueueEntry {
            id: self.id,
            to: self.recipient,
            name: self.name,
            otp: self.otp,
            status: self.status.parse().map_err(|e| corrupt("email queue", e))?,
            error: self.error,
            created_at: self.created_at,
            sent_at: self.sent_at,
            failed_at: self.failed_at,
        })
    }
}

//=========================================================================================
// Booking transitions
//=========================================================================================

impl DbAdapter {
    /// Locks the doctor row and then the booking row, so that transitions on the
    /// same doctor's bookings are serialized, and checks the transition is legal.
    async fn lock_pending_booking(
        tx: &mut Transaction<'_, Postgres>,
        doctor_id: Uuid,
        booking_id: Uuid,
        target: BookingStatus,
    ) -> PortResult<()> {
        sqlx::query("SELECT uid FROM doctors WHERE uid = $1 FOR UPDATE")
            .bind(doctor_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Doctor {} not found", doctor_id)))?;

        let status: String = sqlx::query_scalar(
            "SELECT status FROM bookings WHERE id = $1 AND doctor_id = $2 FOR UPDATE",
        )
        .bind(booking_id)
        .bind(doctor_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Booking {} not found", booking_id)))?;

        let current: BookingStatus = status.parse().map_err(|e| corrupt("booking", e))?;
        ensure_transition(current, target).map_err(|e| PortError::Conflict(e.to_string()))
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_doctor(&self, doctor: NewDoctor, hashed_password: &str) -> PortResult<Doctor> {
        let record = sqlx::query_as::<_, DoctorRecord>(&format!(
            "INSERT INTO doctors (uid, name, phone, email, department, hospital, degree, \
             appointment_time, place, registration_number, dob, age, hashed_password) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {}",
            DOCTOR_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&doctor.name)
        .bind(&doctor.phone)
        .bind(&doctor.email)
        .bind(&doctor.department)
        .bind(&doctor.hospital)
        .bind(&doctor.degree)
        .bind(&doctor.appointment_time)
        .bind(&doctor.place)
        .bind(&doctor.registration_number)
        .bind(doctor.dob)
        .bind(doctor.age as i32)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => PortError::Conflict(
                format!("A doctor with email {} already exists", doctor.email),
            ),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn get_doctor(&self, uid: Uuid) -> PortResult<Doctor> {
        let record = sqlx::query_as::<_, DoctorRecord>(&format!(
            "SELECT {} FROM doctors WHERE uid = $1",
            DOCTOR_COLUMNS
        ))
        .bind(uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Doctor {} not found", uid)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn get_doctor_credentials_by_email(&self, email: &str) -> PortResult<DoctorCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT uid, email, hashed_password FROM doctors WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Doctor {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(DoctorCredentials {
            uid: record.uid,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn list_doctors(&self) -> PortResult<Vec<Doctor>> {
        let records = sqlx::query_as::<_, DoctorRecord>(&format!(
            "SELECT {} FROM doctors WHERE status = 'active' ORDER BY name ASC",
            DOCTOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_doctor_profile(
        &self,
        uid: Uuid,
        update: DoctorProfileUpdate,
    ) -> PortResult<Doctor> {
        let record = sqlx::query_as::<_, DoctorRecord>(&format!(
            "UPDATE doctors SET name = $1, phone = $2, email = $3, hospital = $4, degree = $5, \
             appointment_time = $6, place = $7 WHERE uid = $8 RETURNING {}",
            DOCTOR_COLUMNS
        ))
        .bind(&update.name)
        .bind(&update.phone)
        .bind(update.email.trim().to_lowercase())
        .bind(&update.hospital)
        .bind(&update.degree)
        .bind(&update.appointment_time)
        .bind(&update.place)
        .bind(uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Doctor {} not found", uid)),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Email {} is already in use", update.email))
            }
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn delete_doctor(&self, uid: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM doctors WHERE uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Doctor {} not found", uid)));
        }
        info!(doctor_id = %uid, "Doctor account deleted");
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        doctor_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, doctor_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(doctor_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT doctor_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_booking(&self, doctor_id: Uuid, booking: NewBooking) -> PortResult<Booking> {
        let doctor_name: String = sqlx::query_scalar("SELECT name FROM doctors WHERE uid = $1")
            .bind(doctor_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Doctor {} not found", doctor_id)))?;

        let record = sqlx::query_as::<_, BookingRecord>(&format!(
            "INSERT INTO bookings (id, doctor_id, patient_name, phone, age, reason, email, \
             doctor_name, status) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending') \
             RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(doctor_id)
        .bind(&booking.patient_name)
        .bind(&booking.phone)
        .bind(booking.age as i32)
        .bind(&booking.reason)
        .bind(&booking.email)
        .bind(&doctor_name)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_booking(&self, doctor_id: Uuid, booking_id: Uuid) -> PortResult<Booking> {
        let record = sqlx::query_as::<_, BookingRecord>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 AND doctor_id = $2",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .bind(doctor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Booking {} not found", booking_id))
            }
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn list_bookings_for_doctor(&self, doctor_id: Uuid) -> PortResult<Vec<Booking>> {
        let records = sqlx::query_as::<_, BookingRecord>(&format!(
            "SELECT {} FROM bookings WHERE doctor_id = $1 ORDER BY created_at DESC, id DESC",
            BOOKING_COLUMNS
        ))
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn accept_booking(
        &self,
        doctor_id: Uuid,
        booking_id: Uuid,
        accepted_at: DateTime<Utc>,
    ) -> PortResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        Self::lock_pending_booking(&mut tx, doctor_id, booking_id, BookingStatus::Accepted)
            .await?;

        let accepted: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE doctor_id = $1 AND status = 'accepted'",
        )
        .bind(doctor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        let slot = assign_slot(usize::try_from(accepted).unwrap_or(0));

        let record = sqlx::query_as::<_, BookingRecord>(&format!(
            "UPDATE bookings SET status = 'accepted', serial_number = $1, appointment_time = $2, \
             appointment_duration = $3, accepted_at = $4 WHERE id = $5 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(slot.serial_number as i32)
        .bind(&slot.appointment_time)
        .bind(&slot.appointment_duration)
        .bind(accepted_at)
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        debug!(%booking_id, serial = slot.serial_number, "Booking accepted");
        record.to_domain()
    }

    async fn reject_booking(
        &self,
        doctor_id: Uuid,
        booking_id: Uuid,
        rejected_at: DateTime<Utc>,
    ) -> PortResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        Self::lock_pending_booking(&mut tx, doctor_id, booking_id, BookingStatus::Rejected)
            .await?;

        let record = sqlx::query_as::<_, BookingRecord>(&format!(
            "UPDATE bookings SET status = 'rejected', rejected_at = $1 WHERE id = $2 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(rejected_at)
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn issue_otp(&self, record: OtpRecord, resend_cooldown: Duration) -> PortResult<()> {
        let written = sqlx::query(
            "INSERT INTO otp_verifications (identifier, otp, created_at, expires_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (identifier) DO UPDATE \
             SET otp = EXCLUDED.otp, created_at = EXCLUDED.created_at, expires_at = EXCLUDED.expires_at \
             WHERE otp_verifications.created_at <= $5",
        )
        .bind(&record.identifier)
        .bind(&record.otp)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.created_at - resend_cooldown)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?
        .rows_affected();

        if written == 1 {
            return Ok(());
        }
        let existing = self.get_otp(&record.identifier).await?;
        let retry_after_secs = resend_wait(existing.as_ref(), record.created_at, resend_cooldown)
            .unwrap_or_else(|| resend_cooldown.num_seconds());
        debug!(identifier = %record.identifier, retry_after_secs, "OTP refused inside cooldown");
        Err(PortError::RateLimited { retry_after_secs })
    }

    async fn get_otp(&self, identifier: &str) -> PortResult<Option<OtpRecord>> {
        let row = sqlx::query_as::<_, OtpRow>(
            "SELECT identifier, otp, created_at, expires_at FROM otp_verifications \
             WHERE identifier = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(OtpRow::to_domain))
    }

    async fn delete_otp(&self, identifier: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM otp_verifications WHERE identifier = $1")
            .bind(identifier)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn purge_expired_otps(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM otp_verifications WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn mark_identifier_verified(
        &self,
        identifier: &str,
        verified_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO verified_identifiers (identifier, verified_at) VALUES ($1, $2) \
             ON CONFLICT (identifier) DO UPDATE SET verified_at = EXCLUDED.verified_at",
        )
        .bind(identifier)
        .bind(verified_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn is_identifier_verified(
        &self,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM verified_identifiers \
             WHERE identifier = $1 AND verified_at >= $2)",
        )
        .bind(identifier)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn enqueue_email(&self, to: &str, name: &str, otp: &str) -> PortResult<EmailQueueEntry> {
        let record = sqlx::query_as::<_, EmailQueueRecord>(&format!(
            "INSERT INTO email_queue (id, recipient, name, otp, status) \
             VALUES ($1, $2, $3, $4, 'pending') RETURNING {}",
            EMAIL_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(to)
        .bind(name)
        .bind(otp)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn mark_email_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> PortResult<()> {
        sqlx::query("UPDATE email_queue SET status = $1, sent_at = $2 WHERE id = $3")
            .bind(EmailStatus::Sent.as_str())
            .bind(sent_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_email_failed(
        &self,
        id: Uuid,
        error: &str,
        failed_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("UPDATE email_queue SET status = $1, error = $2, failed_at = $3 WHERE id = $4")
            .bind(EmailStatus::Failed.as_str())
            .bind(error)
            .bind(failed_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn purge_email_queue(&self, cutoff: DateTime<Utc>) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM email_queue WHERE created_at <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}
