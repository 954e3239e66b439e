pub mod challenge;
pub mod gift;
pub mod health;
pub mod submission;
pub mod track;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /gifts                               create, list (auth)
/// /gifts/{id}                          get, delete (auth, owner)
/// /gifts/{id}/cancel                   cancel (auth, owner)
/// /gifts/{id}/resend                   resend initial notification (auth, owner)
/// /gifts/{id}/events                   event log (auth, owner)
/// /gifts/{id}/submissions              photo submission history (auth, owner)
///
/// /challenges/{id}                     get (auth, owner)
/// /challenges/{id}/progress            confirm a step (auth, owner)
///
/// /submissions/pending                 caller's review queue (auth)
/// /submissions/{id}/review             approve or reject (auth, owner)
///
/// /track/{tracking_id}                 recipient view (public)
/// /track/{tracking_id}/submissions     app-channel submission (public)
///
/// /webhooks/sms                        inbound SMS (public, form-encoded)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/gifts", gift::router())
        .nest("/challenges", challenge::router())
        .nest("/submissions", submission::router())
        .nest("/track", track::router())
        .nest("/webhooks", webhook::router())
}
