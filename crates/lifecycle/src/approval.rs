//! Approval Workflow: the human review sub-flow for photo/video challenges.
//!
//! A submission is announced to the sender on every channel the sender can
//! be reached on. The sender's decision is announced to the recipient on
//! every channel the recipient can be reached on. Notification failures are
//! reported by the gateway and never fail the operation.

use giftlock_core::approval::{normalize_review_reason, ReviewAction, SubmissionStatus};
use giftlock_core::error::CoreError;
use giftlock_core::gift::GiftStatus;
use giftlock_core::templates::TemplateKind;
use giftlock_core::types::DbId;
use giftlock_db::models::challenge::Challenge;
use giftlock_db::models::gift::Gift;
use giftlock_db::models::photo_submission::{PhotoSubmission, ResolvedSubmission};
use giftlock_events::{event_types, Audience, DispatchReport, LifecycleEvent};
use serde::Serialize;

use crate::context::{ensure_owner, LifecycleContext};
use crate::error::LifecycleResult;

/// Result of a review decision.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub submission: PhotoSubmission,
    pub gift: Gift,
    pub notification: DispatchReport,
}

#[derive(Clone)]
pub struct ApprovalWorkflow {
    ctx: LifecycleContext,
}

impl ApprovalWorkflow {
    pub fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Tell the sender a submission is waiting for them.
    pub async fn request_review(
        &self,
        gift: &Gift,
        challenge: &Challenge,
        submission: &PhotoSubmission,
    ) -> DispatchReport {
        tracing::info!(
            gift_id = gift.id,
            submission_id = submission.id,
            "Submission awaiting sender review"
        );
        self.ctx.publish(
            LifecycleEvent::new(event_types::SUBMISSION_RECEIVED, gift.id).with_payload(
                serde_json::json!({
                    "submission_id": submission.id,
                    "media_url": submission.media_url,
                }),
            ),
        );

        let mut data = self.ctx.template_data(gift, challenge);
        data.media_url = Some(submission.media_url.clone());
        self.ctx
            .gateway
            .dispatch(gift, Audience::Sender, TemplateKind::ApprovalRequested, &data)
            .await
    }

    /// Approve or reject a pending submission.
    ///
    /// The submission and its gift are resolved in one store write: of two
    /// racing reviews exactly one succeeds, and a gift cancelled or expired
    /// mid-review leaves the submission pending. Both lose with `Conflict`.
    /// Approval unlocks the gift. Rejection returns it to `pending` so the
    /// recipient can try again.
    pub async fn review(
        &self,
        submission_id: DbId,
        sender_id: DbId,
        action: ReviewAction,
        reason: Option<&str>,
    ) -> LifecycleResult<ReviewOutcome> {
        let reason = normalize_review_reason(action, reason)?;

        let pending = self
            .ctx
            .store
            .get_photo_submission(submission_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "PhotoSubmission",
                id: submission_id,
            })?;
        let gift = self.ctx.load_gift(pending.gift_id).await?;
        ensure_owner(&gift, sender_id)?;

        if gift.status != GiftStatus::PendingApproval {
            return Err(CoreError::Conflict(format!(
                "Gift {} is '{}' and has nothing awaiting review",
                gift.id, gift.status
            ))
            .into());
        }

        let ResolvedSubmission { submission, gift } = self
            .ctx
            .store
            .resolve_photo_submission(
                submission_id,
                action.resulting_status(),
                reason.as_deref(),
            )
            .await?;

        let (event_type, kind) = match submission.status {
            SubmissionStatus::Approved => (
                event_types::SUBMISSION_APPROVED,
                TemplateKind::SubmissionApproved,
            ),
            _ => (
                event_types::SUBMISSION_REJECTED,
                TemplateKind::SubmissionRejected,
            ),
        };

        tracing::info!(
            gift_id = gift.id,
            submission_id,
            decision = %submission.status,
            "Submission reviewed"
        );
        self.ctx.publish(
            LifecycleEvent::new(event_type, gift.id)
                .with_actor(sender_id)
                .with_payload(serde_json::json!({
                    "submission_id": submission_id,
                    "reason": submission.rejection_reason,
                })),
        );
        if gift.unlocked {
            self.ctx.publish(
                LifecycleEvent::new(event_types::GIFT_UNLOCKED, gift.id).with_actor(sender_id),
            );
        }

        let challenge = self.ctx.load_challenge_for_gift(gift.id).await?;
        let mut data = self.ctx.template_data(&gift, &challenge);
        data.reason = submission.rejection_reason.clone();
        let notification = self
            .ctx
            .gateway
            .dispatch(&gift, Audience::RecipientAllChannels, kind, &data)
            .await;

        Ok(ReviewOutcome {
            submission,
            gift,
            notification,
        })
    }

    /// Pending submissions across all of a sender's gifts, oldest first.
    pub async fn pending_for_sender(
        &self,
        sender_id: DbId,
    ) -> LifecycleResult<Vec<PhotoSubmission>> {
        Ok(self
            .ctx
            .store
            .list_pending_submissions_for_sender(sender_id)
            .await?)
    }

    /// Review history for one of the sender's gifts, newest first.
    pub async fn history(
        &self,
        gift_id: DbId,
        sender_id: DbId,
    ) -> LifecycleResult<Vec<PhotoSubmission>> {
        let gift = self.ctx.load_gift(gift_id).await?;
        ensure_owner(&gift, sender_id)?;
        Ok(self.ctx.store.list_photo_submissions(gift_id).await?)
    }
}
