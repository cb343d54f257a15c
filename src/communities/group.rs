use axum::{
    debug_handler,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState,
    chat::msg::{self, ChatMessage},
    parse_id,
    reply::{Payload, Reply},
    session::CurrentUser,
};

use super::{community_exists, is_member};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryQuery {
    community_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GroupSendBody {
    community_id: Option<String>,
    message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct HistoryReply {
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SentReply {
    chat_message: ChatMessage,
}

/// The community must exist and the caller must belong to it.
async fn member_of(db_pool: &SqlitePool, raw_id: Option<String>, user_id: Uuid) -> AppResult<Uuid> {
    let Some(raw_id) = raw_id else {
        return Err(AppError::validation("Please provide a communityId."));
    };
    let community_id = parse_id(&raw_id, "communityId")?;

    community_exists(db_pool, community_id).await?;
    if !is_member(db_pool, community_id, user_id).await? {
        return Err(AppError::Forbidden(
            "Join this community to see and send its messages.".to_owned(),
        ));
    }

    Ok(community_id)
}

#[debug_handler(state = AppState)]
pub(crate) async fn group_history(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    Query(HistoryQuery { community_id }): Query<HistoryQuery>,
) -> AppResult<Reply<HistoryReply>> {
    let community_id = member_of(&db_pool, community_id, user_id).await?;

    let messages = msg::community_history(&db_pool, community_id).await?;
    Ok(Reply::with(StatusCode::OK, "Chat history fetched successfully.", HistoryReply { messages }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_group_message(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(live): State<broadcast::Sender<ChatMessage>>,
    Payload(GroupSendBody { community_id, message }): Payload<GroupSendBody>,
) -> AppResult<Reply<SentReply>> {
    let community_id = member_of(&db_pool, community_id, user_id).await?;
    let body = msg::clean_body(message)?;

    let members: Vec<(String,)> =
        sqlx::query_as("SELECT user_id FROM community_members WHERE community_id=? AND user_id!=? ORDER BY user_id")
            .bind(community_id.to_string())
            .bind(user_id.to_string())
            .fetch_all(&db_pool)
            .await?;
    let receiver_ids = members
        .iter()
        .map(|(member_id,)| Uuid::parse_str(member_id))
        .collect::<Result<Vec<_>, _>>()?;

    let chat_message = msg::store_msg(&db_pool, &live, user_id, receiver_ids, Some(community_id), body).await?;

    Ok(Reply::with(StatusCode::CREATED, "Message sent.", SentReply { chat_message }))
}
