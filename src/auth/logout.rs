use axum::debug_handler;
use tower_sessions::Session;
use tracing::info;

use crate::{AppResult, reply::Reply, session::CurrentUser};

#[debug_handler]
pub(crate) async fn logout(CurrentUser(user_id): CurrentUser, session: Session) -> AppResult<Reply> {
    session.flush().await?;
    info!(%user_id, "signed out");
    Ok(Reply::ok("Logged out successfully."))
}
