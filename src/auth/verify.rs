use axum::{debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    AppError, AppResult, AppState, db,
    notify::Notifier,
    reply::{Payload, Reply},
};

use super::{Channel, CodeCheck, Identifier, OneTimeCode, check_code, required, validate::MISSING_FIELDS};

const ALREADY_VERIFIED: &str = "Account is already verified.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyBody {
    phone_or_email: Option<String>,
    code: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn verify(
    State(db_pool): State<SqlitePool>,
    Payload(body): Payload<VerifyBody>,
) -> AppResult<Reply> {
    let (Some(phone_or_email), Some(code)) = (required(body.phone_or_email), required(body.code)) else {
        return Err(AppError::validation(MISSING_FIELDS));
    };

    let Some(user) = db::find_user_by_identifier(&db_pool, &phone_or_email).await? else {
        return Err(AppError::not_found("User not found."));
    };
    if user.verified {
        return Err(AppError::conflict(ALREADY_VERIFIED));
    }

    match check_code(
        user.verification_code.as_deref(),
        user.otp_expires,
        &code,
        OffsetDateTime::now_utc(),
    ) {
        CodeCheck::Accepted => {}
        CodeCheck::Mismatch => return Err(AppError::validation("Invalid verification code.")),
        CodeCheck::Expired => return Err(AppError::validation("Verification code has expired.")),
    }

    let result = sqlx::query(
        "UPDATE users SET verified=1, verification_code=NULL, otp_expires=NULL WHERE id=? AND verified=0",
    )
    .bind(&user.id)
    .execute(&db_pool)
    .await?;

    // a concurrent verify got there first
    if result.rows_affected() == 0 {
        return Err(AppError::conflict(ALREADY_VERIFIED));
    }

    info!(user_id = %user.id, "user verified");
    Ok(Reply::ok("Account verified successfully."))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResendBody {
    phone_or_email: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct ResendReply {
    channel: Channel,
}

#[debug_handler(state = AppState)]
pub(crate) async fn resend_code(
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    Payload(body): Payload<ResendBody>,
) -> AppResult<Reply<ResendReply>> {
    let Some(phone_or_email) = required(body.phone_or_email) else {
        return Err(AppError::validation(MISSING_FIELDS));
    };

    let Some(user) = db::find_user_by_identifier(&db_pool, &phone_or_email).await? else {
        return Err(AppError::not_found("User not found."));
    };
    if user.verified {
        return Err(AppError::conflict(ALREADY_VERIFIED));
    }

    let identifier = Identifier::parse(&user.phone_or_email)?;
    let otp = OneTimeCode::issue();

    let result = sqlx::query("UPDATE users SET verification_code=?, otp_expires=? WHERE id=? AND verified=0")
        .bind(&otp.code)
        .bind(otp.expires_at.unix_timestamp())
        .bind(&user.id)
        .execute(&db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::conflict(ALREADY_VERIFIED));
    }

    notifier.deliver_code(&identifier, &otp.code).await?;
    info!(user_id = %user.id, "verification code reissued");

    Ok(Reply::with(
        StatusCode::OK,
        "A new verification code has been sent.",
        ResendReply {
            channel: identifier.channel(),
        },
    ))
}
