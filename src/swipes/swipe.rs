use axum::{debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState, db, parse_id,
    reply::{Payload, Reply},
    session::CurrentUser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Direction {
    Left,
    Right,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwipeBody {
    target_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwipeReply {
    target_id: Uuid,
    direction: Direction,
    matched: bool,
}

/// Match rows keep the smaller id first so a pair has one row.
pub(crate) fn ordered_pair(a: Uuid, b: Uuid) -> (String, String) {
    let (a, b) = (a.to_string(), b.to_string());
    if a < b { (a, b) } else { (b, a) }
}

#[debug_handler(state = AppState)]
pub(crate) async fn swipe_left(
    current: CurrentUser,
    State(db_pool): State<SqlitePool>,
    Payload(body): Payload<SwipeBody>,
) -> AppResult<Reply<SwipeReply>> {
    swipe(&db_pool, current, body, Direction::Left).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn swipe_right(
    current: CurrentUser,
    State(db_pool): State<SqlitePool>,
    Payload(body): Payload<SwipeBody>,
) -> AppResult<Reply<SwipeReply>> {
    swipe(&db_pool, current, body, Direction::Right).await
}

async fn swipe(
    db_pool: &SqlitePool,
    CurrentUser(user_id): CurrentUser,
    SwipeBody { target_id }: SwipeBody,
    direction: Direction,
) -> AppResult<Reply<SwipeReply>> {
    let Some(target_id) = target_id else {
        return Err(AppError::validation("Please provide a targetId."));
    };
    let target_id = parse_id(&target_id, "targetId")?;

    if target_id == user_id {
        return Err(AppError::validation("You cannot swipe on yourself."));
    }
    if !db::user_exists(db_pool, target_id).await? {
        return Err(AppError::not_found("User not found."));
    }

    sqlx::query(
        "INSERT INTO swipes (swiper_id,target_id,direction,swiped_at) VALUES (?,?,?,?)
         ON CONFLICT (swiper_id,target_id) DO UPDATE SET direction=excluded.direction, swiped_at=excluded.swiped_at",
    )
    .bind(user_id.to_string())
    .bind(target_id.to_string())
    .bind(direction.as_str())
    .bind(db::now())
    .execute(db_pool)
    .await?;

    let (user_a, user_b) = ordered_pair(user_id, target_id);
    let matched = match direction {
        Direction::Left => {
            // passing on someone undoes an earlier match
            sqlx::query("DELETE FROM matches WHERE user_a=? AND user_b=?")
                .bind(&user_a)
                .bind(&user_b)
                .execute(db_pool)
                .await?;
            false
        }
        Direction::Right => {
            let liked_back: Option<(i64,)> = sqlx::query_as(
                "SELECT 1 FROM swipes WHERE swiper_id=? AND target_id=? AND direction='right'",
            )
            .bind(target_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(db_pool)
            .await?;

            if liked_back.is_some() {
                sqlx::query(
                    "INSERT INTO matches (user_a,user_b,matched_at) VALUES (?,?,?) ON CONFLICT DO NOTHING",
                )
                .bind(&user_a)
                .bind(&user_b)
                .bind(db::now())
                .execute(db_pool)
                .await?;
                info!(%user_id, %target_id, "new match");
            }
            liked_back.is_some()
        }
    };

    let message = match (direction, matched) {
        (Direction::Left, _) => "Swiped left.",
        (Direction::Right, false) => "Swiped right.",
        (Direction::Right, true) => "It's a match!",
    };

    Ok(Reply::with(
        StatusCode::OK,
        message,
        SwipeReply {
            target_id,
            direction,
            matched,
        },
    ))
}
