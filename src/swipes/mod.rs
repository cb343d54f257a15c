mod matches;
mod swipe;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/swipeLeft", post(swipe::swipe_left))
        .route("/swipeRight", post(swipe::swipe_right))
        .route("/matches", get(matches::list_matches))
        .route("/discover", get(matches::discover))
}
