//! Public recipient endpoints, addressed by tracking id.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use giftlock_core::validator::SubmissionContent;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of an app-channel submission. Media is uploaded elsewhere and
/// referenced by URL.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TrackSubmissionRequest {
    #[validate(length(max = 2000))]
    pub text: Option<String>,
    #[validate(url)]
    pub media_url: Option<String>,
    #[validate(length(max = 100))]
    pub media_content_type: Option<String>,
}

impl TrackSubmissionRequest {
    fn into_content(self) -> SubmissionContent {
        let media_url = self.media_url.filter(|u| !u.trim().is_empty());
        SubmissionContent {
            text: self.text.unwrap_or_default(),
            media_count: u32::from(media_url.is_some()),
            media_url,
            media_content_type: self.media_content_type,
        }
    }
}

/// GET /api/v1/track/{tracking_id}
pub async fn get_tracking_view(
    State(state): State<AppState>,
    Path(tracking_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let view = state.lifecycle.tracking_view(tracking_id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/track/{tracking_id}/submissions
///
/// Apply a submission to this gift directly. A submission that does not
/// satisfy the challenge is reported as `invalid` with a 200, not an error.
pub async fn submit(
    State(state): State<AppState>,
    Path(tracking_id): Path<Uuid>,
    Json(body): Json<TrackSubmissionRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;

    let submitted = state
        .lifecycle
        .submit_via_tracking(tracking_id, &body.into_content())
        .await?;

    tracing::info!(%tracking_id, outcome = submitted.outcome, "App submission handled");
    Ok(Json(DataResponse { data: submitted }))
}
