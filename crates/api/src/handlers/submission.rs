//! Photo/video review endpoints for the sender.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use giftlock_core::approval::ReviewAction;
use giftlock_core::types::DbId;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    pub action: ReviewAction,
    /// Shown to the recipient on rejection.
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// GET /api/v1/submissions/pending
///
/// Submissions waiting for the caller's review, oldest first.
pub async fn list_pending(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let pending = state
        .lifecycle
        .approvals()
        .pending_for_sender(auth.user_id)
        .await?;
    Ok(Json(DataResponse { data: pending }))
}

/// POST /api/v1/submissions/{id}/review
///
/// Approve or reject a pending submission. A second review of the same
/// submission is a 409.
pub async fn review_submission(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(submission_id): Path<DbId>,
    Json(body): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;

    let outcome = state
        .lifecycle
        .approvals()
        .review(
            submission_id,
            auth.user_id,
            body.action,
            body.reason.as_deref(),
        )
        .await?;

    tracing::info!(
        user_id = auth.user_id,
        submission_id,
        decision = %outcome.submission.status,
        "Submission review recorded"
    );
    Ok(Json(DataResponse { data: outcome }))
}
