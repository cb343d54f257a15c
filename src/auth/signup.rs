use std::sync::Arc;

use axum::{debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState,
    config::Config,
    notify::Notifier,
    reply::{Payload, Reply},
};

use super::{
    Channel, Identifier, NewUser, OneTimeCode, create_user, hash_password, is_valid_password,
    normalize_gender, normalize_genders, parse_birth_date, required,
    validate::{MISSING_FIELDS, WEAK_PASSWORD},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupBody {
    name: Option<String>,
    phone_or_email: Option<String>,
    password: Option<String>,
    date_of_birth: Option<String>,
    gender: Option<String>,
    preferred_genders: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupReply {
    user_id: Uuid,
    channel: Channel,
}

#[debug_handler(state = AppState)]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    State(config): State<Arc<Config>>,
    Payload(body): Payload<SignupBody>,
) -> AppResult<Reply<SignupReply>> {
    let (
        Some(name),
        Some(phone_or_email),
        Some(password),
        Some(date_of_birth),
        Some(gender),
        Some(preferred_genders),
    ) = (
        required(body.name),
        required(body.phone_or_email),
        body.password.filter(|password| !password.is_empty()),
        required(body.date_of_birth),
        required(body.gender),
        body.preferred_genders.and_then(normalize_genders),
    )
    else {
        return Err(AppError::validation(MISSING_FIELDS));
    };

    if !is_valid_password(&password) {
        return Err(AppError::validation(WEAK_PASSWORD));
    }

    let date_of_birth = parse_birth_date(&date_of_birth, OffsetDateTime::now_utc().date())?;
    let identifier = Identifier::parse(&phone_or_email)?;

    let user = NewUser {
        name,
        identifier,
        password_hash: hash_password(password, config.bcrypt_cost).await?,
        date_of_birth,
        gender: normalize_gender(&gender),
        preferred_genders,
    };
    let otp = OneTimeCode::issue();
    let user_id = create_user(&db_pool, &user, &otp).await?;

    // the account stays even when delivery fails; /resendCode recovers it
    notifier.deliver_code(&user.identifier, &otp.code).await?;

    let channel = user.identifier.channel();
    let message = match channel {
        Channel::Email => "User created successfully. Please check your email for the verification code.",
        Channel::Sms => "User created successfully. Please check your phone for the OTP.",
    };

    Ok(Reply::with(
        StatusCode::CREATED,
        message,
        SignupReply { user_id, channel },
    ))
}
