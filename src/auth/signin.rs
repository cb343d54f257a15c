use std::sync::Arc;

use axum::{debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState,
    config::Config,
    db,
    reply::{Payload, Reply},
    session::USER_ID,
};

use super::{hash_password, required, validate::MISSING_FIELDS, verify_password};

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SigninBody {
    phone_or_email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SigninReply {
    user_id: Uuid,
    name: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn signin(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Payload(body): Payload<SigninBody>,
) -> AppResult<Reply<SigninReply>> {
    let (Some(phone_or_email), Some(password)) = (
        required(body.phone_or_email),
        body.password.filter(|password| !password.is_empty()),
    ) else {
        return Err(AppError::validation(MISSING_FIELDS));
    };

    let Some(user) = db::find_user_by_identifier(&db_pool, &phone_or_email).await? else {
        // one bcrypt round, like a wrong password
        hash_password(password, config.bcrypt_cost).await?;
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
    };
    if !verify_password(password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
    }
    if !user.verified {
        return Err(AppError::Forbidden(
            "Please verify your account before signing in.".to_owned(),
        ));
    }

    let user_id = user.uuid()?;
    session.cycle_id().await?;
    session.insert(USER_ID, user_id).await?;

    info!(%user_id, "welcome back");
    Ok(Reply::with(
        StatusCode::OK,
        "Signed in successfully.",
        SigninReply {
            user_id,
            name: user.name,
        },
    ))
}
