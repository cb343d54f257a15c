mod logout;
mod otp;
mod signin;
mod signup;
mod validate;
mod verify;

use axum::{Router, routing::post};
use sqlx::SqlitePool;
use time::Date;
use tracing::info;
use uuid::Uuid;

pub use otp::{CODE_TTL, CodeCheck, OneTimeCode, check_code};
pub use validate::{Channel, Identifier, is_valid_password};
pub(crate) use validate::{normalize_gender, normalize_genders, parse_birth_date, required};

use crate::{AppError, AppResult, AppState, db};

pub const USER_ROLE: &str = "USER";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup::signup))
        .route("/verify", post(verify::verify))
        .route("/resendCode", post(verify::resend_code))
        .route("/signin", post(signin::signin))
        .route("/logout", post(logout::logout))
}

pub(crate) struct NewUser {
    pub(crate) name: String,
    pub(crate) identifier: Identifier,
    pub(crate) password_hash: String,
    pub(crate) date_of_birth: Date,
    pub(crate) gender: String,
    pub(crate) preferred_genders: Vec<String>,
}

/// Inserts an unverified user holding `otp`. The unique identifier column
/// decides duplicates.
pub(crate) async fn create_user(
    db_pool: &SqlitePool,
    user: &NewUser,
    otp: &OneTimeCode,
) -> AppResult<Uuid> {
    let uuid = Uuid::now_v7();

    let result = sqlx::query(
        "INSERT INTO users (id,phone_or_email,name,date_of_birth,gender,preferred_genders,password_hash,role,verified,verification_code,otp_expires,created_at)
         VALUES (?,?,?,?,?,?,?,?,0,?,?,?)",
    )
    .bind(uuid.to_string())
    .bind(user.identifier.as_str())
    .bind(&user.name)
    .bind(user.date_of_birth.to_string())
    .bind(&user.gender)
    .bind(serde_json::to_string(&user.preferred_genders)?)
    .bind(&user.password_hash)
    .bind(USER_ROLE)
    .bind(&otp.code)
    .bind(otp.expires_at.unix_timestamp())
    .bind(otp.issued_at.unix_timestamp())
    .execute(db_pool)
    .await;

    match result {
        Ok(_) => {
            info!(user_id = %uuid, channel = %user.identifier.channel(), "added unverified user");
            Ok(uuid)
        }
        Err(err) if db::is_unique_violation(&err) => Err(AppError::conflict("User already exists.")),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

pub(crate) async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}
