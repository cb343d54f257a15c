mod page;
mod photo;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(page::get_profile).put(page::update_profile))
        .route("/uploadPhoto", post(photo::upload_photo))
}
