//! Signup, verification and code resend through the HTTP surface.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::http::StatusCode;
use common::{PASSWORD, TestApp};
use serde_json::json;

fn signup_body() -> serde_json::Value {
    json!({
        "name": "Ana",
        "phoneOrEmail": "ana@example.com",
        "password": PASSWORD,
        "dateOfBirth": "1996-02-29",
        "gender": "Female",
        "preferredGenders": ["Male", "female"],
    })
}

#[tokio::test]
async fn email_signup_sends_code_by_email() {
    let app = TestApp::new().await;

    let response = app.post("/signup", signup_body(), None).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["error"], false);
    assert_eq!(response.body["channel"], "email");
    assert_eq!(
        response.body["message"],
        "User created successfully. Please check your email for the verification code."
    );

    {
        let emails = app.emails.lock().unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "ana@example.com");
        assert_eq!(emails[0].subject, "Email Verification");
        assert!(app.texts.lock().unwrap().is_empty());
    }

    let code = app.last_code("ana@example.com");
    assert_eq!(code.len(), 6);
    let value: u32 = code.parse().unwrap();
    assert!((100_000..=999_999).contains(&value));
}

#[tokio::test]
async fn phone_signup_sends_code_by_sms() {
    let app = TestApp::new().await;

    let response = app.signup("+919876543210", "male", &["female"]).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["channel"], "sms");
    assert_eq!(
        response.body["message"],
        "User created successfully. Please check your phone for the OTP."
    );

    assert_eq!(app.texts.lock().unwrap().len(), 1);
    assert!(app.emails.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stored_code_expires_ten_minutes_out() {
    let app = TestApp::new().await;
    app.post("/signup", signup_body(), None).await;

    let (code, expires, created): (String, i64, i64) =
        sqlx::query_as("SELECT verification_code, otp_expires, created_at FROM users")
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(code, app.last_code("ana@example.com"));
    assert_eq!(expires - created, 600);
}

#[tokio::test]
async fn password_is_hashed() {
    let app = TestApp::new().await;
    app.post("/signup", signup_body(), None).await;

    let (hash,): (String,) = sqlx::query_as("SELECT password_hash FROM users")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_ne!(hash, PASSWORD);
    assert!(bcrypt::verify(PASSWORD, &hash).unwrap());
}

#[tokio::test]
async fn missing_fields_are_rejected_without_writing() {
    let app = TestApp::new().await;

    for field in ["name", "phoneOrEmail", "password", "dateOfBirth", "gender", "preferredGenders"] {
        let mut body = signup_body();
        body.as_object_mut().unwrap().remove(field);

        let response = app.post("/signup", body, None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "without {field}");
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["message"], "Please provide all required fields.");
    }

    let mut blank = signup_body();
    blank["name"] = json!("   ");
    assert_eq!(app.post("/signup", blank, None).await.status, StatusCode::BAD_REQUEST);

    let mut no_genders = signup_body();
    no_genders["preferredGenders"] = json!([]);
    assert_eq!(app.post("/signup", no_genders, None).await.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.user_count().await, 0);
    assert!(app.emails.lock().unwrap().is_empty());
}

#[tokio::test]
async fn weak_passwords_are_rejected() {
    let app = TestApp::new().await;

    for password in ["short1!", "alllettersnodigit!", "NoSymbol123"] {
        let mut body = signup_body();
        body["password"] = json!(password);

        let response = app.post("/signup", body, None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{password}");
        assert_eq!(
            response.body["message"],
            "Password must be 8-20 characters long and contain at least one letter, one number, and one special character."
        );
    }

    assert_eq!(app.user_count().await, 0);
}

#[tokio::test]
async fn unrecognized_identifier_is_rejected_without_writing() {
    let app = TestApp::new().await;

    let mut body = signup_body();
    body["phoneOrEmail"] = json!("notanemail");

    let response = app.post("/signup", body, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Invalid phone number or email format.");
    assert_eq!(app.user_count().await, 0);
}

#[tokio::test]
async fn bad_birth_date_is_rejected() {
    let app = TestApp::new().await;

    for date in ["12/04/1995", "2999-01-01"] {
        let mut body = signup_body();
        body["dateOfBirth"] = json!(date);
        assert_eq!(app.post("/signup", body, None).await.status, StatusCode::BAD_REQUEST, "{date}");
    }
}

#[tokio::test]
async fn malformed_json_uses_envelope() {
    let app = TestApp::new().await;

    let response = app
        .post("/signup", json!({ "preferredGenders": "everyone" }), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], true);
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = TestApp::new().await;

    let first = app.post("/signup", signup_body(), None).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.post("/signup", signup_body(), None).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["message"], "User already exists.");

    assert_eq!(app.user_count().await, 1);
    assert_eq!(app.emails.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn racing_signups_leave_one_account() {
    let app = TestApp::new().await;

    let (a, b) = tokio::join!(
        app.post("/signup", signup_body(), None),
        app.post("/signup", signup_body(), None),
    );

    let mut statuses = [a.status, b.status];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
    assert_eq!(app.user_count().await, 1);
}

#[tokio::test]
async fn delivery_failure_keeps_the_account() {
    let app = TestApp::with_failing_delivery().await;

    let response = app.post("/signup", signup_body(), None).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Error sending verification email.");

    assert_eq!(app.user_count().await, 1);
    assert!(!app.is_verified("ana@example.com").await);
}

#[tokio::test]
async fn correct_code_verifies_once() {
    let app = TestApp::new().await;
    app.post("/signup", signup_body(), None).await;
    let code = app.last_code("ana@example.com");

    let body = json!({ "phoneOrEmail": "ana@example.com", "code": code });
    let first = app.post("/verify", body.clone(), None).await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert!(app.is_verified("ana@example.com").await);

    let second = app.post("/verify", body, None).await;
    assert_eq!(second.status, StatusCode::CONFLICT);

    let (code, expires): (Option<String>, Option<i64>) =
        sqlx::query_as("SELECT verification_code, otp_expires FROM users")
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert!(code.is_none());
    assert!(expires.is_none());
}

#[tokio::test]
async fn wrong_code_leaves_account_unverified() {
    let app = TestApp::new().await;
    app.post("/signup", signup_body(), None).await;
    let code = app.last_code("ana@example.com");
    let wrong = if code == "999999" { "100000" } else { "999999" };

    let response = app
        .post("/verify", json!({ "phoneOrEmail": "ana@example.com", "code": wrong }), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Invalid verification code.");
    assert!(!app.is_verified("ana@example.com").await);
}

#[tokio::test]
async fn expired_code_leaves_account_unverified() {
    let app = TestApp::new().await;
    app.post("/signup", signup_body(), None).await;
    let code = app.last_code("ana@example.com");

    sqlx::query("UPDATE users SET otp_expires = otp_expires - 601")
        .execute(&app.db_pool)
        .await
        .unwrap();

    let response = app
        .post("/verify", json!({ "phoneOrEmail": "ana@example.com", "code": code }), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Verification code has expired.");
    assert!(!app.is_verified("ana@example.com").await);
}

#[tokio::test]
async fn verify_unknown_user_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .post("/verify", json!({ "phoneOrEmail": "ghost@example.com", "code": "123456" }), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resend_replaces_the_code() {
    let app = TestApp::new().await;
    app.post("/signup", signup_body(), None).await;

    sqlx::query("UPDATE users SET otp_expires = otp_expires - 601")
        .execute(&app.db_pool)
        .await
        .unwrap();

    let response = app
        .post("/resendCode", json!({ "phoneOrEmail": "ana@example.com" }), None)
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["channel"], "email");
    assert_eq!(app.emails.lock().unwrap().len(), 2);

    let code = app.last_code("ana@example.com");
    let verify = app
        .post("/verify", json!({ "phoneOrEmail": "ana@example.com", "code": code }), None)
        .await;
    assert_eq!(verify.status, StatusCode::OK, "{}", verify.body);

    let again = app
        .post("/resendCode", json!({ "phoneOrEmail": "ana@example.com" }), None)
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn failed_resend_still_stores_the_new_code() {
    let app = TestApp::with_failing_delivery().await;
    app.post("/signup", signup_body(), None).await;

    let stored_code = || async {
        let (code, expires): (String, i64) =
            sqlx::query_as("SELECT verification_code, otp_expires FROM users")
                .fetch_one(&app.db_pool)
                .await
                .unwrap();
        (code, expires)
    };

    sqlx::query("UPDATE users SET verification_code='000000', otp_expires=otp_expires-601")
        .execute(&app.db_pool)
        .await
        .unwrap();
    let (old_code, old_expires) = stored_code().await;

    let response = app
        .post("/resendCode", json!({ "phoneOrEmail": "ana@example.com" }), None)
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Error sending verification email.");

    let (new_code, new_expires) = stored_code().await;
    assert_ne!(new_code, old_code);
    assert!(new_expires > old_expires);
    assert!(!app.is_verified("ana@example.com").await);
}
