mod direct;
pub mod msg;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;

pub use msg::ChatMessage;

/// `/{receiver_id}` is a catch-all at the root, so this router is merged
/// last; static paths win over it anyway.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::chat_ws))
        .route("/{receiver_id}", get(direct::chat_history).post(direct::send_message))
}
