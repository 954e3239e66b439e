use axum::routing::{get, post};
use axum::Router;

use crate::handlers::gift;
use crate::state::AppState;

/// Routes mounted at `/gifts`.
///
/// ```text
/// POST   /                      create_gift
/// GET    /                      list_gifts
/// GET    /{id}                  get_gift
/// DELETE /{id}                  delete_gift
/// POST   /{id}/cancel           cancel_gift
/// POST   /{id}/resend           resend_notification
/// GET    /{id}/events           list_events
/// GET    /{id}/submissions      list_submissions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(gift::create_gift).get(gift::list_gifts))
        .route("/{id}", get(gift::get_gift).delete(gift::delete_gift))
        .route("/{id}/cancel", post(gift::cancel_gift))
        .route("/{id}/resend", post(gift::resend_notification))
        .route("/{id}/events", get(gift::list_events))
        .route("/{id}/submissions", get(gift::list_submissions))
}
