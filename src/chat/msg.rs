use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{AppError, AppResult, db};

pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A persisted chat message, as stored and as pushed to live listeners.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_ids: Vec<Uuid>,
    pub community_id: Option<Uuid>,
    pub body: String,
    pub created_at: i64,
}

impl ChatMessage {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.receiver_ids.contains(&user_id)
    }
}

pub(crate) fn clean_body(raw: Option<String>) -> AppResult<String> {
    let body = raw.as_deref().map(str::trim).unwrap_or_default();
    if body.is_empty() {
        return Err(AppError::validation("Message cannot be empty."));
    }
    if body.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message cannot be longer than {MAX_MESSAGE_CHARS} characters."
        )));
    }
    Ok(body.to_owned())
}

/// Writes the message and its receivers in one transaction, then pushes it
/// to live listeners.
pub(crate) async fn store_msg(
    db_pool: &SqlitePool,
    live: &broadcast::Sender<ChatMessage>,
    sender_id: Uuid,
    receiver_ids: Vec<Uuid>,
    community_id: Option<Uuid>,
    body: String,
) -> AppResult<ChatMessage> {
    let message = ChatMessage {
        id: Uuid::now_v7(),
        sender_id,
        receiver_ids,
        community_id,
        body,
        created_at: db::now(),
    };

    let mut txn = db_pool.begin().await?;
    sqlx::query("INSERT INTO chat_messages (id,sender_id,community_id,body,created_at) VALUES (?,?,?,?,?)")
        .bind(message.id.to_string())
        .bind(message.sender_id.to_string())
        .bind(message.community_id.as_ref().map(Uuid::to_string))
        .bind(&message.body)
        .bind(message.created_at)
        .execute(&mut *txn)
        .await?;
    for receiver_id in &message.receiver_ids {
        sqlx::query("INSERT INTO message_receivers (message_id,receiver_id) VALUES (?,?)")
            .bind(message.id.to_string())
            .bind(receiver_id.to_string())
            .execute(&mut *txn)
            .await?;
    }
    txn.commit().await?;

    // nobody listening is fine
    let _ = live.send(message.clone());

    Ok(message)
}

type MessageRow = (String, String, Option<String>, String, i64);

/// Hydrates rows of `id,sender_id,community_id,body,created_at` with their
/// receivers.
pub(crate) async fn load_msgs(db_pool: &SqlitePool, rows: Vec<MessageRow>) -> AppResult<Vec<ChatMessage>> {
    let mut messages = Vec::with_capacity(rows.len());
    for (id, sender_id, community_id, body, created_at) in rows {
        let receivers: Vec<(String,)> =
            sqlx::query_as("SELECT receiver_id FROM message_receivers WHERE message_id=? ORDER BY receiver_id")
                .bind(&id)
                .fetch_all(db_pool)
                .await?;

        messages.push(ChatMessage {
            id: Uuid::parse_str(&id)?,
            sender_id: Uuid::parse_str(&sender_id)?,
            receiver_ids: receivers
                .iter()
                .map(|(receiver_id,)| Uuid::parse_str(receiver_id))
                .collect::<Result<_, _>>()?,
            community_id: match community_id {
                Some(x) => Some(Uuid::parse_str(&x)?),
                None => None,
            },
            body,
            created_at,
        });
    }
    Ok(messages)
}

pub(crate) async fn direct_history(db_pool: &SqlitePool, user_id: Uuid, other_id: Uuid) -> AppResult<Vec<ChatMessage>> {
    let rows: Vec<MessageRow> = sqlx::query_as(
        "SELECT m.id,m.sender_id,m.community_id,m.body,m.created_at FROM chat_messages m
         JOIN message_receivers r ON r.message_id = m.id
         WHERE m.community_id IS NULL
           AND ((m.sender_id = ?1 AND r.receiver_id = ?2) OR (m.sender_id = ?2 AND r.receiver_id = ?1))
         ORDER BY m.created_at, m.id",
    )
    .bind(user_id.to_string())
    .bind(other_id.to_string())
    .fetch_all(db_pool)
    .await?;

    load_msgs(db_pool, rows).await
}

pub(crate) async fn community_history(db_pool: &SqlitePool, community_id: Uuid) -> AppResult<Vec<ChatMessage>> {
    let rows: Vec<MessageRow> = sqlx::query_as(
        "SELECT id,sender_id,community_id,body,created_at FROM chat_messages
         WHERE community_id=?
         ORDER BY created_at, id",
    )
    .bind(community_id.to_string())
    .fetch_all(db_pool)
    .await?;

    load_msgs(db_pool, rows).await
}
