use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Provider callbacks mounted at `/webhooks`.
pub fn router() -> Router<AppState> {
    Router::new().route("/sms", post(webhook::inbound_sms))
}
