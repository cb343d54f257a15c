mod group;
mod list;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/getCommunity", get(list::get_communities))
        .route("/createCommunity", post(list::create_community))
        .route("/joinCommunity", post(list::join_community))
        .route("/chatHistory", get(group::group_history))
        .route("/sendGroupMessage", post(group::send_group_message))
}

pub(crate) async fn community_exists(db_pool: &SqlitePool, community_id: Uuid) -> AppResult<()> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM communities WHERE id=?")
        .bind(community_id.to_string())
        .fetch_optional(db_pool)
        .await?;

    row.map(|_| ()).ok_or_else(|| AppError::not_found("Community not found."))
}

pub(crate) async fn is_member(db_pool: &SqlitePool, community_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM community_members WHERE community_id=? AND user_id=?")
        .bind(community_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(db_pool)
        .await?;

    Ok(row.is_some())
}
