use axum::{
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{AppState, session::CurrentUser};

use super::{direct, msg::ChatMessage};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendFrame {
    receiver_id: Uuid,
    message: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn chat_ws(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(live): State<broadcast::Sender<ChatMessage>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| serve_socket(stream, user_id, db_pool, live))
}

async fn serve_socket(
    stream: WebSocket,
    user_id: Uuid,
    db_pool: SqlitePool,
    live: broadcast::Sender<ChatMessage>,
) {
    let mut rx = live.subscribe();
    let (mut sender, mut receiver) = stream.split();

    let mut push_task = tokio::spawn(async move {
        loop {
            let message = match rx.recv().await {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%user_id, skipped, "live chat listener lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !message.involves(user_id) {
                continue;
            }

            let Ok(text) = serde_json::to_string(&message) else {
                continue;
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let Ok(SendFrame { receiver_id, message }) = serde_json::from_str(text.as_str()) else {
                continue;
            };

            if let Err(err) = direct::send_direct(&db_pool, &live, user_id, receiver_id, Some(message)).await {
                debug!(%user_id, "dropped websocket message: {err}");
            }
        }
    });

    tokio::select! {
        _ = &mut push_task => read_task.abort(),
        _ = &mut read_task => push_task.abort(),
    };
}
