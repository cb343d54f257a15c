use axum::{
    debug_handler,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::StatusCode,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppError, AppResult, AppState, db, reply::Reply, session::CurrentUser};

use super::{MAX_IMAGES_PER_UPLOAD, read_uploads, store::MediaStore};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageView {
    key: String,
    url: String,
    content_type: String,
    uploaded_at: i64,
}

#[derive(Serialize)]
pub(crate) struct ImagesReply {
    images: Vec<ImageView>,
}

#[derive(Serialize)]
pub(crate) struct ImageReply {
    image: ImageView,
}

async fn owned_image(db_pool: &SqlitePool, user_id: Uuid, key: &str) -> AppResult<()> {
    let owned: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM images WHERE key=? AND user_id=?")
        .bind(key)
        .bind(user_id.to_string())
        .fetch_optional(db_pool)
        .await?;

    owned.map(|_| ()).ok_or_else(|| AppError::not_found("Image not found."))
}

#[debug_handler(state = AppState)]
pub(crate) async fn upload_images(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Reply<ImagesReply>> {
    let uploads = read_uploads(multipart, "images", MAX_IMAGES_PER_UPLOAD).await?;

    let mut images = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let key = upload.new_key();
        let uploaded_at = db::now();

        media.put(&key, upload.bytes, &upload.content_type).await?;
        sqlx::query("INSERT INTO images (key,user_id,content_type,uploaded_at) VALUES (?,?,?,?)")
            .bind(&key)
            .bind(user_id.to_string())
            .bind(&upload.content_type)
            .bind(uploaded_at)
            .execute(&db_pool)
            .await?;

        images.push(ImageView {
            url: media.url(&key),
            key,
            content_type: upload.content_type,
            uploaded_at,
        });
    }

    info!(%user_id, count = images.len(), "images uploaded");
    Ok(Reply::with(
        StatusCode::CREATED,
        "Images uploaded successfully.",
        ImagesReply { images },
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn replace_image(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    Path(key): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Reply<ImageReply>> {
    owned_image(&db_pool, user_id, &key).await?;

    let upload = read_uploads(multipart, "images", MAX_IMAGES_PER_UPLOAD)
        .await?
        .swap_remove(0);
    // the key's extension decides how the object is served
    if key.rsplit_once('.').map(|(_, extension)| extension) != Some(upload.extension) {
        return Err(AppError::validation(
            "A replacement must have the same image type as the original.",
        ));
    }
    let uploaded_at = db::now();

    media.put(&key, upload.bytes, &upload.content_type).await?;
    sqlx::query("UPDATE images SET content_type=?, uploaded_at=? WHERE key=?")
        .bind(&upload.content_type)
        .bind(uploaded_at)
        .bind(&key)
        .execute(&db_pool)
        .await?;

    Ok(Reply::with(
        StatusCode::OK,
        "Image replaced successfully.",
        ImageReply {
            image: ImageView {
                url: media.url(&key),
                key,
                content_type: upload.content_type,
                uploaded_at,
            },
        },
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_images(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
) -> AppResult<Reply<ImagesReply>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT key,content_type,uploaded_at FROM images WHERE user_id=? ORDER BY uploaded_at DESC, key DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(&db_pool)
    .await?;

    let images = rows
        .into_iter()
        .map(|(key, content_type, uploaded_at)| ImageView {
            url: media.url(&key),
            key,
            content_type,
            uploaded_at,
        })
        .collect();

    Ok(Reply::with(StatusCode::OK, "Images fetched successfully.", ImagesReply { images }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn remove_image(
    CurrentUser(user_id): CurrentUser,
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    Path(key): Path<String>,
) -> AppResult<Reply> {
    owned_image(&db_pool, user_id, &key).await?;

    sqlx::query("DELETE FROM images WHERE key=?")
        .bind(&key)
        .execute(&db_pool)
        .await?;
    if let Err(err) = media.delete(&key).await {
        warn!(%key, "image row removed but object delete failed: {err:#}");
    }

    Ok(Reply::ok("Image removed successfully."))
}
