use std::str::FromStr;

use serde::Serialize;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{AppResult, images::store::ObjectStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    phone_or_email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    gender TEXT NOT NULL,
    preferred_genders TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'USER',
    bio TEXT,
    photo_key TEXT,
    verified INTEGER NOT NULL DEFAULT 0,
    verification_code TEXT,
    otp_expires INTEGER,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS swipes (
    swiper_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    direction TEXT NOT NULL CHECK (direction IN ('left', 'right')),
    swiped_at INTEGER NOT NULL,
    PRIMARY KEY (swiper_id, target_id)
);

CREATE TABLE IF NOT EXISTS matches (
    user_a TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    user_b TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    matched_at INTEGER NOT NULL,
    PRIMARY KEY (user_a, user_b),
    CHECK (user_a < user_b)
);

CREATE TABLE IF NOT EXISTS images (
    key TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content_type TEXT NOT NULL,
    uploaded_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS images_by_user ON images (user_id, uploaded_at);

CREATE TABLE IF NOT EXISTS communities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    created_by TEXT REFERENCES users(id) ON DELETE SET NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS community_members (
    community_id TEXT NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    joined_at INTEGER NOT NULL,
    PRIMARY KEY (community_id, user_id)
);

CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY,
    sender_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    community_id TEXT REFERENCES communities(id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS chat_messages_by_community ON chat_messages (community_id, created_at);

CREATE TABLE IF NOT EXISTS message_receivers (
    message_id TEXT NOT NULL REFERENCES chat_messages(id) ON DELETE CASCADE,
    receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (message_id, receiver_id)
);
CREATE INDEX IF NOT EXISTS message_receivers_by_receiver ON message_receivers (receiver_id);
"#;

pub async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;

    migrate(&db_pool).await?;
    info!("database ready at {url}");

    Ok(db_pool)
}

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(db_pool).await?;
    Ok(())
}

/// Unix seconds; every timestamp column uses this.
pub fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub phone_or_email: String,
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    /// JSON array of lowercase genders.
    pub preferred_genders: String,
    pub password_hash: String,
    pub role: String,
    pub bio: Option<String>,
    pub photo_key: Option<String>,
    pub verified: bool,
    pub verification_code: Option<String>,
    pub otp_expires: Option<i64>,
    pub created_at: i64,
}

/// What other users get to see.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

impl User {
    pub fn uuid(&self) -> AppResult<Uuid> {
        Ok(Uuid::parse_str(&self.id)?)
    }

    pub fn preferred_genders(&self) -> Vec<String> {
        serde_json::from_str(&self.preferred_genders).unwrap_or_default()
    }

    pub fn photo_url(&self, media: &dyn ObjectStore) -> Option<String> {
        self.photo_key.as_deref().map(|key| media.url(key))
    }

    pub fn summary(&self, media: &dyn ObjectStore) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            gender: self.gender.clone(),
            date_of_birth: self.date_of_birth.clone(),
            bio: self.bio.clone(),
            photo_url: self.photo_url(media),
        }
    }
}

pub async fn find_user(db_pool: &SqlitePool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id=?")
        .bind(id.to_string())
        .fetch_optional(db_pool)
        .await
}

pub async fn find_user_by_identifier(
    db_pool: &SqlitePool,
    phone_or_email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE phone_or_email=?")
        .bind(phone_or_email)
        .fetch_optional(db_pool)
        .await
}

pub async fn user_exists(db_pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE id=?")
        .bind(id.to_string())
        .fetch_optional(db_pool)
        .await?;
    Ok(row.is_some())
}
