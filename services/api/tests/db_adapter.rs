//! Runs against a real Postgres through `DATABASE_URL`:
//! `cargo test -p api --test db_adapter -- --ignored`

use api_lib::adapters::DbAdapter;
use chrono::{Duration, NaiveDate, Utc};
use doctor_finder_core::domain::{NewBooking, NewDoctor};
use doctor_finder_core::otp::new_record;
use doctor_finder_core::ports::{DatabaseService, PortError};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinSet;

fn new_doctor() -> NewDoctor {
    NewDoctor {
        name: "Abdur Rahman".to_string(),
        phone: "01712345678".to_string(),
        email: "abdur@example.com".to_string(),
        department: "Cardiology".to_string(),
        hospital: "Square Hospital".to_string(),
        degree: "MBBS, FCPS".to_string(),
        appointment_time: "5:30 PM".to_string(),
        place: "Dhaka".to_string(),
        registration_number: "A-12345".to_string(),
        dob: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
        age: 46,
    }
}

fn new_booking(n: usize) -> NewBooking {
    NewBooking {
        patient_name: format!("Patient {}", n),
        phone: "01812345678".to_string(),
        age: 34,
        reason: "Chest pain".to_string(),
        email: "patient@example.com".to_string(),
    }
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn concurrent_accepts_get_distinct_serials(pool: PgPool) {
    let db = Arc::new(DbAdapter::new(pool));
    let doctor = db.create_doctor(new_doctor(), "hash").await.unwrap();
    let mut ids = Vec::new();
    for n in 0..8 {
        ids.push(db.create_booking(doctor.uid, new_booking(n)).await.unwrap().id);
    }

    let mut accepts = JoinSet::new();
    for id in ids {
        let db = db.clone();
        accepts.spawn(async move { db.accept_booking(doctor.uid, id, Utc::now()).await });
    }
    let mut serials = Vec::new();
    while let Some(accepted) = accepts.join_next().await {
        serials.push(accepted.unwrap().unwrap().serial_number.unwrap());
    }

    serials.sort_unstable();
    assert_eq!(serials, (1..=8).collect::<Vec<u32>>());
}

#[sqlx::test]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn otp_inside_cooldown_is_not_overwritten(pool: PgPool) {
    let db = DbAdapter::new(pool);
    let cooldown = Duration::seconds(60);
    let ttl = Duration::minutes(10);
    let first_at = Utc::now();

    db.issue_otp(new_record("01712345678", "111111".to_string(), first_at, ttl), cooldown)
        .await
        .unwrap();
    let refused = db
        .issue_otp(
            new_record("01712345678", "222222".to_string(), first_at + Duration::seconds(20), ttl),
            cooldown,
        )
        .await;

    assert!(matches!(
        refused,
        Err(PortError::RateLimited { retry_after_secs: 40 })
    ));
    assert_eq!(db.get_otp("01712345678").await.unwrap().unwrap().otp, "111111");

    db.issue_otp(
        new_record("01712345678", "333333".to_string(), first_at + cooldown, ttl),
        cooldown,
    )
    .await
    .unwrap();
    assert_eq!(db.get_otp("01712345678").await.unwrap().unwrap().otp, "333333");
}
