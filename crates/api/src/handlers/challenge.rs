//! Challenge endpoints for the sender.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use giftlock_core::error::CoreError;
use giftlock_core::types::DbId;
use giftlock_db::models::challenge::Challenge;
use giftlock_db::models::gift::GiftWithChallenge;
use giftlock_lifecycle::SubmissionOutcome;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmStepRequest {
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    /// `advanced` or `completed`.
    pub outcome: &'static str,
    #[serde(flatten)]
    pub gift: GiftWithChallenge,
}

async fn load_challenge(state: &AppState, challenge_id: DbId) -> AppResult<Challenge> {
    state
        .store
        .get_challenge(challenge_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Challenge",
                id: challenge_id,
            })
        })
}

/// GET /api/v1/challenges/{id}
pub async fn get_challenge(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let challenge = load_challenge(&state, challenge_id).await?;
    let owned = state
        .lifecycle
        .context()
        .load_owned(challenge.gift_id, auth.user_id)
        .await?;
    Ok(Json(DataResponse {
        data: owned.challenge,
    }))
}

/// POST /api/v1/challenges/{id}/progress
///
/// Record one externally confirmed step of a `custom` or `multi-day`
/// challenge.
pub async fn confirm_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(challenge_id): Path<DbId>,
    Json(body): Json<ConfirmStepRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;

    let outcome = state
        .lifecycle
        .confirm_step(challenge_id, auth.user_id, body.note)
        .await?;

    let response = match outcome {
        SubmissionOutcome::Advanced(gift) => ProgressResponse {
            outcome: "advanced",
            gift,
        },
        SubmissionOutcome::Completed(gift) => ProgressResponse {
            outcome: "completed",
            gift,
        },
        // The gift closed between the check and the write.
        _ => {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Challenge {challenge_id} no longer accepts progress"
            ))))
        }
    };

    Ok(Json(DataResponse { data: response }))
}
