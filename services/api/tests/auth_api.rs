mod common;

use axum::http::{header, StatusCode};
use chrono::{Duration, Utc};
use common::{request, TestApp};
use doctor_finder_core::ports::DatabaseService;
use serde_json::{json, Value};

const PHONE: &str = "01712345678";

fn signup_body() -> Value {
    json!({
        "name": "Abdur Rahman",
        "phone": PHONE,
        "email": "Rahman@Example.com",
        "password": "Secret#2024",
        "confirmPassword": "Secret#2024",
        "department": "Cardiology",
        "hospital": "Square Hospital",
        "degree": "MBBS, FCPS",
        "appointmentTime": "5:30 PM",
        "place": "Dhaka",
        "registrationNumber": "A-12345",
        "dob": "1980-05-17"
    })
}

async fn verify_phone(app: &TestApp) {
    app.state
        .db
        .mark_identifier_verified(PHONE, Utc::now())
        .await
        .unwrap();
}

#[tokio::test]
async fn signup_requires_a_verified_phone() {
    let app = TestApp::new();

    let res = app.post("/auth/signup", signup_body(), None).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body, "Please verify your phone number first.");
}

#[tokio::test]
async fn stale_verification_does_not_count() {
    let app = TestApp::new();
    app.state
        .db
        .mark_identifier_verified(PHONE, Utc::now() - Duration::minutes(31))
        .await
        .unwrap();

    let res = app.post("/auth/signup", signup_body(), None).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signup_after_otp_flow_creates_doctor_and_session() {
    let app = TestApp::new();
    app.post("/otp/request", json!({"channel": "sms", "destination": PHONE}), None)
        .await;
    let code = app.db.otp(PHONE).unwrap().otp;
    let verified = app
        .post("/otp/verify", json!({"destination": PHONE, "code": code}), None)
        .await;
    assert_eq!(verified.status, StatusCode::OK);

    let res = app.post("/auth/signup", signup_body(), None).await;

    assert_eq!(res.status, StatusCode::CREATED);
    let doctor = &res.body["doctor"];
    assert_eq!(doctor["email"], "rahman@example.com");
    assert_eq!(doctor["role"], "doctor");
    assert_eq!(doctor["status"], "active");
    assert_eq!(doctor["dob"], "1980-05-17");
    assert!(doctor.get("hashedPassword").is_none());
    assert_eq!(res.body["passwordStrength"], "Very Strong");

    let session = res.session_cookie().expect("session cookie");
    let me = app.get("/me", Some(&session)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["name"], "Abdur Rahman");
}

#[tokio::test]
async fn signup_reports_the_first_invalid_field() {
    let app = TestApp::new();
    verify_phone(&app).await;
    let mut body = signup_body();
    body["confirmPassword"] = json!("Secret#2025");
    body["dob"] = json!("not a date");

    let res = app.post("/auth/signup", body, None).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body, "Passwords do not match");
}

#[tokio::test]
async fn underage_doctors_cannot_register() {
    let app = TestApp::new();
    verify_phone(&app).await;
    let mut body = signup_body();
    let dob = Utc::now().date_naive() - Duration::days(365 * 10);
    body["dob"] = json!(dob.format("%Y-%m-%d").to_string());

    let res = app.post("/auth/signup", body, None).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new();
    verify_phone(&app).await;
    let first = app.post("/auth/signup", signup_body(), None).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.post("/auth/signup", signup_body(), None).await;

    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = TestApp::new();
    verify_phone(&app).await;
    app.post("/auth/signup", signup_body(), None).await;

    let ok = app
        .post(
            "/auth/login",
            json!({"email": "rahman@example.com", "password": "Secret#2024"}),
            None,
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["email"], "rahman@example.com");
    assert!(ok.session_cookie().is_some());

    let wrong = app
        .post(
            "/auth/login",
            json!({"email": "rahman@example.com", "password": "wrong-password"}),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .post(
            "/auth/login",
            json!({"email": "nobody@example.com", "password": "Secret#2024"}),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body, "Invalid email or password");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    let doctor = app.seed_doctor("Abdur Rahman", "Cardiology", "Square Hospital");
    let session = app.login_as(doctor.uid).await;

    let res = app
        .send(request("POST", "/auth/logout", None, Some(&session)))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let cleared = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.starts_with("session=;"), "{}", cleared);
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(res.session_cookie(), None);

    let me = app.get("/me", Some(&session)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    let again = app.send(request("POST", "/auth/logout", None, None)).await;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);
}
