//! Persistence interface used by the lifecycle engine.
//!
//! Every method is an atomic operation. Methods that change state check the
//! current state under a per-entity lock (row lock in PostgreSQL, a mutex in
//! memory) so concurrent lifecycle transitions cannot lose updates.

use async_trait::async_trait;
use giftlock_core::approval::SubmissionStatus;
use giftlock_core::gift::GiftStatus;
use giftlock_core::types::{DbId, Timestamp};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::challenge::{Challenge, NewChallenge, ProgressUpdate};
use crate::models::gift::{Gift, GiftWithChallenge, NewGift};
use crate::models::gift_event::GiftEvent;
use crate::models::photo_submission::{NewPhotoSubmission, PhotoSubmission, ResolvedSubmission};

#[async_trait]
pub trait GiftStore: Send + Sync {
    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> StoreResult<()>;

    /// Create a gift in `pending` status together with its challenge.
    async fn create_gift(
        &self,
        gift: &NewGift,
        challenge: &NewChallenge,
    ) -> StoreResult<GiftWithChallenge>;

    async fn get_gift(&self, id: DbId) -> StoreResult<Option<Gift>>;

    async fn get_gift_by_tracking_id(&self, tracking_id: Uuid) -> StoreResult<Option<Gift>>;

    /// A sender's gifts, newest first.
    async fn list_gifts_for_sender(&self, sender_id: DbId) -> StoreResult<Vec<Gift>>;

    /// Delete a gift and everything it owns. Returns `false` if it did not exist.
    async fn delete_gift(&self, id: DbId) -> StoreResult<bool>;

    async fn get_challenge(&self, id: DbId) -> StoreResult<Option<Challenge>>;

    async fn get_challenge_for_gift(&self, gift_id: DbId) -> StoreResult<Option<Challenge>>;

    /// Commit new progress, the gift status it implies, and the unlock flag
    /// as one write.
    ///
    /// Fails with `StaleVersion` if the challenge is no longer at
    /// `expected_version`, and with `Conflict` if the gift cannot move to the
    /// requested status.
    async fn save_challenge_progress(&self, update: &ProgressUpdate)
        -> StoreResult<GiftWithChallenge>;

    /// Move a gift to `to` if its current status is one of `from` and the
    /// lifecycle graph allows the step; `Conflict` otherwise.
    async fn set_gift_status(
        &self,
        id: DbId,
        from: &[GiftStatus],
        to: GiftStatus,
    ) -> StoreResult<Gift>;

    /// Record a submission awaiting review. `Conflict` if the gift already
    /// has one pending.
    async fn create_photo_submission(
        &self,
        input: &NewPhotoSubmission,
    ) -> StoreResult<PhotoSubmission>;

    async fn get_photo_submission(&self, id: DbId) -> StoreResult<Option<PhotoSubmission>>;

    /// A gift's submissions, newest first.
    async fn list_photo_submissions(&self, gift_id: DbId) -> StoreResult<Vec<PhotoSubmission>>;

    /// Pending submissions on a sender's gifts, oldest first.
    async fn list_pending_submissions_for_sender(
        &self,
        sender_id: DbId,
    ) -> StoreResult<Vec<PhotoSubmission>>;

    /// Resolve a pending submission without touching its gift. Used to close
    /// out a submission whose gift could not take it. `Conflict` if it was
    /// already reviewed.
    async fn update_photo_submission_status(
        &self,
        id: DbId,
        status: SubmissionStatus,
        reason: Option<&str>,
    ) -> StoreResult<PhotoSubmission>;

    /// Apply a review decision to a submission and its gift as one write.
    ///
    /// `Approved` completes and unlocks the gift with the submission's media
    /// as evidence; `Rejected` returns the gift to `pending`. Nothing is
    /// written unless the submission is still pending and the gift is still
    /// `pending_approval`; otherwise `Conflict`.
    async fn resolve_photo_submission(
        &self,
        id: DbId,
        decision: SubmissionStatus,
        reason: Option<&str>,
    ) -> StoreResult<ResolvedSubmission>;

    /// Non-terminal gifts addressed to `phone` with their challenges,
    /// most recently created first.
    async fn find_active_gifts_by_recipient_contact(
        &self,
        phone: &str,
    ) -> StoreResult<Vec<GiftWithChallenge>>;

    /// Non-terminal gifts whose `expires_at` is at or before `now`.
    async fn find_expired_gifts(&self, now: Timestamp, limit: i64) -> StoreResult<Vec<Gift>>;

    async fn append_event(
        &self,
        gift_id: DbId,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> StoreResult<GiftEvent>;

    /// A gift's events in recording order.
    async fn list_events(&self, gift_id: DbId) -> StoreResult<Vec<GiftEvent>>;
}

/// Shared check for conditional gift status writes.
pub(crate) fn check_gift_transition(
    gift: &Gift,
    from: &[GiftStatus],
    to: GiftStatus,
) -> StoreResult<()> {
    if !from.contains(&gift.status) || !gift.status.can_transition_to(to) {
        return Err(crate::error::StoreError::Conflict(format!(
            "Gift {} is '{}' and cannot move to '{to}'",
            gift.id, gift.status
        )));
    }
    Ok(())
}

/// The gift status a review decision leads to.
pub(crate) fn gift_status_after_review(decision: SubmissionStatus) -> StoreResult<GiftStatus> {
    match decision {
        SubmissionStatus::Approved => Ok(GiftStatus::Completed),
        SubmissionStatus::Rejected => Ok(GiftStatus::Pending),
        SubmissionStatus::PendingApproval => Err(crate::error::StoreError::Conflict(
            "A review must approve or reject".to_string(),
        )),
    }
}

/// Generate a fresh public tracking ID.
pub(crate) fn new_tracking_id() -> Uuid {
    Uuid::new_v4()
}
