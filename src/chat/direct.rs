use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState, db, parse_id,
    reply::{Payload, Reply},
    session::CurrentUser,
};

use super::msg::{self, ChatMessage};

#[derive(Deserialize)]
pub(crate) struct SendBody {
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

/// Shared by the HTTP route and the WebSocket.
pub(crate) async fn send_direct(
    db_pool: &SqlitePool,
    live: &broadcast::Sender<ChatMessage>,
    sender_id: Uuid,
    receiver_id: Uuid,
    body: Option<String>,
) -> AppResult<ChatMessage> {
    let body = msg::clean_body(body)?;
    if receiver_id == sender_id {
        return Err(AppError::validation("You cannot message yourself."));
    }
    if !db::user_exists(db_pool, receiver_id).await? {
        return Err(AppError::not_found("Receiver not found."));
    }

    msg::store_msg(db_pool, live, sender_id, vec![receiver_id], None, body).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn chat_history(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    Path(receiver_id): Path<String>,
) -> AppResult<Reply<HistoryReply>> {
    let receiver_id = parse_id(&receiver_id, "receiverId")?;
    if !db::user_exists(&db_pool, receiver_id).await? {
        return Err(AppError::not_found("Receiver not found."));
    }

    let messages = msg::direct_history(&db_pool, user_id, receiver_id).await?;
    Ok(Reply::with(StatusCode::OK, "Chat history fetched successfully.", HistoryReply { messages }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(live): State<broadcast::Sender<ChatMessage>>,
    Path(receiver_id): Path<String>,
    Payload(SendBody { message }): Payload<SendBody>,
) -> AppResult<Reply<SentReply>> {
    let receiver_id = parse_id(&receiver_id, "receiverId")?;
    let chat_message = send_direct(&db_pool, &live, user_id, receiver_id, message).await?;

    Ok(Reply::with(StatusCode::CREATED, "Message sent.", SentReply { chat_message }))
}
