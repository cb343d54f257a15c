pub mod auth;
pub mod chat;
pub mod communities;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod notify;
pub mod profiles;
pub mod reply;
pub mod session;
pub mod swipes;

use std::{any::Any, sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{Method, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use uuid::Uuid;

pub use error::{AppError, AppResult};

use chat::ChatMessage;
use config::Config;
use images::store::MediaStore;
use notify::Notifier;

const LIVE_CHAT_BACKLOG: usize = 256;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub notifier: Notifier,
    pub media: MediaStore,
    pub tx: broadcast::Sender<ChatMessage>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, notifier: Notifier, media: MediaStore, config: Config) -> Self {
        AppState {
            db_pool,
            notifier,
            media,
            tx: broadcast::channel(LIVE_CHAT_BACKLOG).0,
            config: Arc::new(config),
        }
    }
}

/// The whole HTTP surface with its layers.
pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            state.config.session_idle_minutes,
        )));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let media_dir = ServeDir::new(&state.config.media_dir);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .merge(auth::router())
        .merge(profiles::router())
        .merge(swipes::router())
        .merge(images::router())
        .merge(communities::router())
        .merge(chat::router())
        .nest_service("/media", media_dir)
        .layer(body_limit)
        .with_state(state)
        .layer(session_layer)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    AppError::Internal(anyhow!("handler panicked: {detail}")).into_response()
}

/// Parses a client-supplied id, naming the field when it is malformed.
pub fn parse_id(raw: &str, field: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("{field} is not a valid id.")))
}
