use axum::routing::{get, post};
use axum::Router;

use crate::handlers::submission;
use crate::state::AppState;

/// Routes mounted at `/submissions`.
///
/// ```text
/// GET    /pending               list_pending
/// POST   /{id}/review           review_submission
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(submission::list_pending))
        .route("/{id}/review", post(submission::review_submission))
}
