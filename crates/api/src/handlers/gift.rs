//! Sender-facing gift endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use giftlock_core::challenge::{ChallengeRequirements, ChallengeType};
use giftlock_core::error::CoreError;
use giftlock_core::gift::DeliveryMethod;
use giftlock_core::types::{DbId, Timestamp};
use giftlock_lifecycle::CreateGiftInput;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /gifts`.
///
/// Enum-valued fields arrive as strings so unknown values produce a
/// validation error naming the accepted values.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGiftRequest {
    #[validate(length(max = 100))]
    pub recipient_name: Option<String>,
    #[validate(length(max = 32))]
    pub recipient_phone: Option<String>,
    #[validate(length(max = 254))]
    pub recipient_email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub gift_type: String,
    #[validate(length(max = 100))]
    pub gift_value: Option<String>,
    #[validate(length(max = 1000))]
    pub gift_description: Option<String>,
    #[validate(length(max = 1000))]
    pub personal_note: Option<String>,
    pub delivery_method: String,
    pub challenge_type: String,
    #[validate(length(min = 1, max = 1000))]
    pub challenge_description: String,
    #[serde(default)]
    pub requirements: ChallengeRequirements,
    pub expires_at: Option<Timestamp>,
}

impl CreateGiftRequest {
    fn into_input(self) -> Result<CreateGiftInput, CoreError> {
        let delivery_method: DeliveryMethod =
            self.delivery_method.parse().map_err(CoreError::Validation)?;
        let challenge_type: ChallengeType =
            self.challenge_type.parse().map_err(CoreError::Validation)?;

        Ok(CreateGiftInput {
            recipient_name: self.recipient_name,
            recipient_phone: self.recipient_phone,
            recipient_email: self.recipient_email,
            gift_type: self.gift_type,
            gift_value: self.gift_value,
            gift_description: self.gift_description,
            personal_note: self.personal_note,
            delivery_method,
            challenge_type,
            challenge_description: self.challenge_description,
            requirements: self.requirements,
            expires_at: self.expires_at,
        })
    }
}

/// POST /api/v1/gifts
///
/// Create a gift with its challenge and send the initial notification. The
/// response carries the per-channel delivery outcome.
pub async fn create_gift(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateGiftRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;
    let input = body.into_input()?;

    let created = state.lifecycle.create_gift(&auth.sender(), input).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/gifts
pub async fn list_gifts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let gifts = state.store.list_gifts_for_sender(auth.user_id).await?;
    Ok(Json(DataResponse { data: gifts }))
}

/// GET /api/v1/gifts/{id}
pub async fn get_gift(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gift_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let gift = state
        .lifecycle
        .context()
        .load_owned(gift_id, auth.user_id)
        .await?;
    Ok(Json(DataResponse { data: gift }))
}

/// DELETE /api/v1/gifts/{id}
pub async fn delete_gift(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gift_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.lifecycle.delete(gift_id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/gifts/{id}/cancel
pub async fn cancel_gift(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gift_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let gift = state.lifecycle.cancel(gift_id, auth.user_id).await?;
    Ok(Json(DataResponse { data: gift }))
}

/// POST /api/v1/gifts/{id}/resend
pub async fn resend_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gift_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let resent = state
        .lifecycle
        .resend_notification(gift_id, auth.user_id)
        .await?;
    Ok(Json(DataResponse { data: resent }))
}

/// GET /api/v1/gifts/{id}/events
///
/// The gift's event log, oldest first.
pub async fn list_events(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gift_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state
        .lifecycle
        .context()
        .load_owned(gift_id, auth.user_id)
        .await?;
    let events = state.store.list_events(gift_id).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/gifts/{id}/submissions
pub async fn list_submissions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(gift_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let submissions = state
        .lifecycle
        .approvals()
        .history(gift_id, auth.user_id)
        .await?;
    Ok(Json(DataResponse { data: submissions }))
}
