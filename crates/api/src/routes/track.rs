use axum::routing::{get, post};
use axum::Router;

use crate::handlers::track;
use crate::state::AppState;

/// Public recipient routes mounted at `/track`. The tracking id is the only
/// credential.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{tracking_id}", get(track::get_tracking_view))
        .route("/{tracking_id}/submissions", post(track::submit))
}
