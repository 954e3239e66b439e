use axum::routing::{get, post};
use axum::Router;

use crate::handlers::challenge;
use crate::state::AppState;

/// Routes mounted at `/challenges`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(challenge::get_challenge))
        .route("/{id}/progress", post(challenge::confirm_progress))
}
