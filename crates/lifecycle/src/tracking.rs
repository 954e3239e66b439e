//! Recipient-facing tracking view and app-channel submissions.
//!
//! Gifts are addressed here by their public `tracking_id`. The view never
//! exposes challenge requirements, and hides the gift's value until it is
//! unlocked.

use giftlock_core::challenge::ChallengeType;
use giftlock_core::error::CoreError;
use giftlock_core::gift::GiftStatus;
use giftlock_core::types::Timestamp;
use giftlock_core::validator::SubmissionContent;
use giftlock_db::models::gift::GiftWithChallenge;
use serde::Serialize;
use uuid::Uuid;

use crate::error::LifecycleResult;
use crate::state_machine::{GiftLifecycle, SubmissionOrigin, SubmissionOutcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingChallenge {
    pub challenge_type: ChallengeType,
    pub description: String,
    pub started: bool,
    pub completed: bool,
    pub current_step: i32,
    pub total_steps: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingView {
    pub tracking_id: Uuid,
    pub sender_name: String,
    pub recipient_name: Option<String>,
    pub gift_type: String,
    /// `None` until the gift is unlocked.
    pub gift_value: Option<String>,
    pub gift_description: Option<String>,
    pub personal_note: Option<String>,
    pub status: GiftStatus,
    pub unlocked: bool,
    pub awaiting_review: bool,
    pub expires_at: Timestamp,
    pub challenge: TrackingChallenge,
}

impl From<&GiftWithChallenge> for TrackingView {
    fn from(value: &GiftWithChallenge) -> Self {
        let GiftWithChallenge { gift, challenge } = value;
        let progress = &challenge.progress;
        Self {
            tracking_id: gift.tracking_id,
            sender_name: gift.sender_name.clone(),
            recipient_name: gift.recipient_name.clone(),
            gift_type: gift.gift_type.clone(),
            gift_value: gift.gift_value.clone().filter(|_| gift.unlocked),
            gift_description: gift.gift_description.clone(),
            personal_note: gift.personal_note.clone(),
            status: gift.status,
            unlocked: gift.unlocked,
            awaiting_review: gift.status == GiftStatus::PendingApproval,
            expires_at: gift.expires_at,
            challenge: TrackingChallenge {
                challenge_type: challenge.challenge_type,
                description: challenge.description.clone(),
                started: progress.started,
                completed: progress.completed,
                current_step: progress.current_step,
                total_steps: progress.total_steps,
            },
        }
    }
}

/// Result of an app-channel submission, as shown to the recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingSubmission {
    /// `advanced`, `completed`, `awaiting_approval`, `already_awaiting_review`,
    /// `invalid`, or `inactive`.
    pub outcome: &'static str,
    pub gift: TrackingView,
}

impl GiftLifecycle {
    async fn load_tracked(&self, tracking_id: Uuid) -> LifecycleResult<GiftWithChallenge> {
        let gift = self
            .ctx
            .store
            .get_gift_by_tracking_id(tracking_id)
            .await?
            .ok_or_else(|| CoreError::NotFoundByKey {
                entity: "Gift",
                key: tracking_id.to_string(),
            })?;
        let challenge = self.ctx.load_challenge_for_gift(gift.id).await?;
        Ok(GiftWithChallenge { gift, challenge })
    }

    pub async fn tracking_view(&self, tracking_id: Uuid) -> LifecycleResult<TrackingView> {
        let tracked = self.load_tracked(tracking_id).await?;
        Ok(TrackingView::from(&tracked))
    }

    /// Apply a submission made in the recipient app to the tracked gift.
    pub async fn submit_via_tracking(
        &self,
        tracking_id: Uuid,
        content: &SubmissionContent,
    ) -> LifecycleResult<TrackingSubmission> {
        let tracked = self.load_tracked(tracking_id).await?;
        let gift_id = tracked.gift.id;

        let outcome = self.submit(tracked, content, SubmissionOrigin::App).await?;

        let (label, current) = match outcome {
            SubmissionOutcome::Advanced(saved) => ("advanced", saved),
            SubmissionOutcome::Completed(saved) => ("completed", saved),
            SubmissionOutcome::AwaitingApproval {
                gift, challenge, ..
            } => ("awaiting_approval", GiftWithChallenge { gift, challenge }),
            other => {
                let label = match other {
                    SubmissionOutcome::AlreadyAwaitingReview => "already_awaiting_review",
                    SubmissionOutcome::Invalid => "invalid",
                    _ => "inactive",
                };
                let current = GiftWithChallenge {
                    gift: self.ctx.load_gift(gift_id).await?,
                    challenge: self.ctx.load_challenge_for_gift(gift_id).await?,
                };
                (label, current)
            }
        };

        Ok(TrackingSubmission {
            outcome: label,
            gift: TrackingView::from(&current),
        })
    }
}
