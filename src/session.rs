use anyhow::anyhow;
use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use crate::AppError;

pub const USER_ID: &str = "user_id";

/// The signed-in user. Rejects with 401 when the session carries no user.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::Internal(anyhow!(message)))?;

        let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
            return Err(AppError::Unauthorized("Please sign in.".to_owned()));
        };

        Ok(CurrentUser(user_id))
    }
}
