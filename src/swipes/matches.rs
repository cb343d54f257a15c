use axum::{debug_handler, extract::State, http::StatusCode};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    AppError, AppResult, AppState,
    db::{self, User, UserSummary},
    images::store::MediaStore,
    reply::Reply,
    session::CurrentUser,
};

const DISCOVER_LIMIT: i64 = 50;

#[derive(Serialize)]
pub(crate) struct MatchesReply {
    matches: Vec<UserSummary>,
}

#[derive(Serialize)]
pub(crate) struct DiscoverReply {
    candidates: Vec<UserSummary>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_matches(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
) -> AppResult<Reply<MatchesReply>> {
    let users: Vec<User> = sqlx::query_as(
        "SELECT u.* FROM matches m
         JOIN users u ON u.id = CASE WHEN m.user_a = ?1 THEN m.user_b ELSE m.user_a END
         WHERE m.user_a = ?1 OR m.user_b = ?1
         ORDER BY m.matched_at DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(&db_pool)
    .await?;

    let matches = users.iter().map(|user| user.summary(media.as_ref())).collect();
    Ok(Reply::with(StatusCode::OK, "Matches fetched successfully.", MatchesReply { matches }))
}

/// Verified users of a preferred gender the caller has not swiped on yet.
#[debug_handler(state = AppState)]
pub(crate) async fn discover(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
) -> AppResult<Reply<DiscoverReply>> {
    let Some(me) = db::find_user(&db_pool, user_id).await? else {
        return Err(AppError::not_found("User not found."));
    };

    let users: Vec<User> = sqlx::query_as(
        "SELECT * FROM users
         WHERE id != ?1
           AND verified = 1
           AND gender IN (SELECT value FROM json_each(?2))
           AND id NOT IN (SELECT target_id FROM swipes WHERE swiper_id = ?1)
         ORDER BY created_at DESC
         LIMIT ?3",
    )
    .bind(&me.id)
    .bind(&me.preferred_genders)
    .bind(DISCOVER_LIMIT)
    .fetch_all(&db_pool)
    .await?;

    let candidates = users.iter().map(|user| user.summary(media.as_ref())).collect();
    Ok(Reply::with(StatusCode::OK, "Candidates fetched successfully.", DiscoverReply { candidates }))
}
