mod gallery;
pub mod store;

use axum::{
    Router,
    body::Bytes,
    extract::{Multipart, multipart::MultipartRejection},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};

pub const MAX_IMAGES_PER_UPLOAD: usize = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uploadImage", post(gallery::upload_images))
        .route("/replace/{key}", put(gallery::replace_image))
        .route("/getImages", get(gallery::get_images))
        .route("/remove/{key}", delete(gallery::remove_image))
}

pub(crate) struct Upload {
    pub(crate) bytes: Bytes,
    pub(crate) content_type: String,
    pub(crate) extension: &'static str,
}

impl Upload {
    /// Fresh object key carrying the upload's extension.
    pub(crate) fn new_key(&self) -> String {
        format!("{}.{}", Uuid::now_v7().simple(), self.extension)
    }
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Collects up to `max` image files from the multipart field `field_name`.
/// Other fields are skipped.
pub(crate) async fn read_uploads(
    multipart: Result<Multipart, MultipartRejection>,
    field_name: &str,
    max: usize,
) -> AppResult<Vec<Upload>> {
    let mut multipart = multipart.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Validation(err.body_text()))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        if uploads.len() == max {
            return Err(AppError::Validation(format!(
                "At most {max} files may be uploaded at once."
            )));
        }

        let content_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
        let Some(extension) = image_extension(&content_type) else {
            return Err(AppError::validation("Only image uploads are allowed."));
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::Validation(err.body_text()))?;
        if bytes.is_empty() {
            return Err(AppError::validation("Uploaded file is empty."));
        }

        uploads.push(Upload {
            bytes,
            content_type,
            extension,
        });
    }

    if uploads.is_empty() {
        return Err(AppError::Validation(format!(
            "No files found in field '{field_name}'."
        )));
    }

    Ok(uploads)
}
