use axum::{
    debug_handler,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    AppError, AppResult, AppState, db,
    images::{read_uploads, store::MediaStore},
    reply::Reply,
    session::CurrentUser,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PhotoReply {
    photo_url: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn upload_photo(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Reply<PhotoReply>> {
    let Some(user) = db::find_user(&db_pool, user_id).await? else {
        return Err(AppError::not_found("User not found."));
    };

    let upload = read_uploads(multipart, "photo", 1).await?.swap_remove(0);
    let key = upload.new_key();

    media.put(&key, upload.bytes, &upload.content_type).await?;
    let updated = sqlx::query("UPDATE users SET photo_key=? WHERE id=?")
        .bind(&key)
        .bind(&user.id)
        .execute(&db_pool)
        .await;
    if let Err(err) = updated {
        if let Err(cleanup) = media.delete(&key).await {
            warn!(%key, "unreferenced profile photo left behind: {cleanup:#}");
        }
        return Err(err.into());
    }

    if let Some(old_key) = user.photo_key {
        if let Err(err) = media.delete(&old_key).await {
            warn!(%old_key, "stale profile photo left behind: {err:#}");
        }
    }

    info!(%user_id, %key, "profile photo replaced");
    Ok(Reply::with(
        StatusCode::CREATED,
        "Photo uploaded successfully.",
        PhotoReply {
            photo_url: media.url(&key),
        },
    ))
}
