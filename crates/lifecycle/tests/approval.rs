mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::*;
use giftlock_core::approval::{ReviewAction, SubmissionStatus};
use giftlock_core::challenge::ChallengeType;
use giftlock_core::error::CoreError;
use giftlock_core::gift::GiftStatus;
use giftlock_core::templates::{
    reply_submission_received, TemplateKind, REPLY_AWAITING_REVIEW, REPLY_TRY_AGAIN,
};
use giftlock_core::types::{DbId, Timestamp};
use giftlock_db::models::challenge::{Challenge, NewChallenge, ProgressUpdate};
use giftlock_db::models::gift::{Gift, GiftWithChallenge, NewGift};
use giftlock_db::models::gift_event::GiftEvent;
use giftlock_db::models::photo_submission::{
    NewPhotoSubmission, PhotoSubmission, ResolvedSubmission,
};
use giftlock_db::{GiftStore, MemoryGiftStore, StoreResult};
use giftlock_lifecycle::{CreatedGift, LifecycleError};
use uuid::Uuid;

const PHOTO_URL: &str = "https://media.example/first.jpg";

async fn photo_gift_with_submission(h: &Harness) -> (CreatedGift, i64) {
    let created = h.create(gift_input(ChallengeType::Photo)).await;
    let reply = h.router.handle(&mms(PHOTO_URL)).await.unwrap();
    assert_eq!(reply.text, reply_submission_received("Sam"));

    let pending = h
        .store()
        .list_photo_submissions(created.gift.gift.id)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    (created, pending[0].id)
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn photo_submission_waits_for_review_without_counting_a_step() {
    let mut h = Harness::new();
    let (created, _) = photo_gift_with_submission(&h).await;

    let gift = h.store().get_gift(created.gift.gift.id).await.unwrap().unwrap();
    assert_eq!(gift.status, GiftStatus::PendingApproval);
    assert!(!gift.unlocked);

    let challenge = h
        .store()
        .get_challenge(created.gift.challenge.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(challenge.progress.current_step, 0);
    assert!(!challenge.progress.completed);

    // The sender hears about it on every channel they have.
    let to_sender = h.sms.sent_to(SENDER_PHONE);
    assert_eq!(to_sender.len(), 1);
    assert!(to_sender[0].contains(PHOTO_URL));
    assert_eq!(
        h.email.kinds_sent_to(SENDER_EMAIL),
        vec![TemplateKind::ApprovalRequested]
    );

    assert!(h
        .drain_event_types()
        .contains(&"submission.received".to_string()));
}

#[tokio::test]
async fn text_only_message_is_not_a_photo() {
    let h = Harness::new();
    h.create(gift_input(ChallengeType::Photo)).await;

    let reply = h.router.handle(&sms("here is my photo, trust me")).await.unwrap();

    assert_eq!(reply.text, REPLY_TRY_AGAIN);
}

#[tokio::test]
async fn second_photo_while_pending_is_refused() {
    let h = Harness::new();
    let (created, _) = photo_gift_with_submission(&h).await;

    let reply = h
        .router
        .handle(&mms("https://media.example/second.jpg"))
        .await
        .unwrap();

    assert_eq!(reply.text, REPLY_AWAITING_REVIEW);
    let submissions = h
        .store()
        .list_photo_submissions(created.gift.gift.id)
        .await
        .unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].media_url, PHOTO_URL);
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approval_unlocks_the_gift() {
    let h = Harness::new();
    let (created, submission_id) = photo_gift_with_submission(&h).await;

    let outcome = h
        .lifecycle
        .approvals()
        .review(submission_id, SENDER_ID, ReviewAction::Approve, None)
        .await
        .unwrap();

    assert_eq!(outcome.submission.status, SubmissionStatus::Approved);
    assert!(outcome.submission.reviewed_at.is_some());
    assert_eq!(outcome.gift.status, GiftStatus::Completed);
    assert!(outcome.gift.unlocked);
    assert_eq!(outcome.gift.unlock_evidence_url.as_deref(), Some(PHOTO_URL));

    let to_recipient = h.sms.sent_to(RECIPIENT_PHONE);
    let last = to_recipient.last().unwrap();
    assert!(last.starts_with("Sam approved your submission!"));
    assert!(last.contains("$25"));

    let gift = h.store().get_gift(created.gift.gift.id).await.unwrap().unwrap();
    assert!(gift.unlocked);
}

#[tokio::test]
async fn rejection_returns_gift_to_pending_with_reason() {
    let h = Harness::new();
    let (created, submission_id) = photo_gift_with_submission(&h).await;

    let outcome = h
        .lifecycle
        .approvals()
        .review(submission_id, SENDER_ID, ReviewAction::Reject, Some("  blurry "))
        .await
        .unwrap();

    assert_eq!(outcome.submission.status, SubmissionStatus::Rejected);
    assert_eq!(outcome.submission.rejection_reason.as_deref(), Some("blurry"));
    assert_eq!(outcome.gift.status, GiftStatus::Pending);
    assert!(!outcome.gift.unlocked);

    let to_recipient = h.sms.sent_to(RECIPIENT_PHONE);
    assert!(to_recipient.last().unwrap().contains("blurry"));

    // The recipient may now try again.
    let reply = h
        .router
        .handle(&mms("https://media.example/sharper.jpg"))
        .await
        .unwrap();
    assert_eq!(reply.text, reply_submission_received("Sam"));

    let history = h
        .lifecycle
        .approvals()
        .history(created.gift.gift.id, SENDER_ID)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, SubmissionStatus::PendingApproval);
    assert_eq!(history[1].status, SubmissionStatus::Rejected);
}

#[tokio::test]
async fn submission_can_only_be_reviewed_once() {
    let h = Harness::new();
    let (_, submission_id) = photo_gift_with_submission(&h).await;
    let approvals = h.lifecycle.approvals();

    approvals
        .review(submission_id, SENDER_ID, ReviewAction::Reject, None)
        .await
        .unwrap();

    assert_matches!(
        approvals
            .review(submission_id, SENDER_ID, ReviewAction::Approve, None)
            .await,
        Err(LifecycleError::Core(CoreError::Conflict(_)))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_reviews_have_exactly_one_winner() {
    let h = Harness::new();
    let (created, submission_id) = photo_gift_with_submission(&h).await;

    let approve = {
        let approvals = h.lifecycle.approvals().clone();
        tokio::spawn(async move {
            approvals
                .review(submission_id, SENDER_ID, ReviewAction::Approve, None)
                .await
        })
    };
    let reject = {
        let approvals = h.lifecycle.approvals().clone();
        tokio::spawn(async move {
            approvals
                .review(submission_id, SENDER_ID, ReviewAction::Reject, Some("no"))
                .await
        })
    };

    let results = [approve.await.unwrap(), reject.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in &results {
        if let Err(err) = result {
            assert_matches!(err, LifecycleError::Core(CoreError::Conflict(_)));
        }
    }

    let submission = h
        .store()
        .get_photo_submission(submission_id)
        .await
        .unwrap()
        .unwrap();
    let gift = h.store().get_gift(created.gift.gift.id).await.unwrap().unwrap();
    match submission.status {
        SubmissionStatus::Approved => assert!(gift.unlocked),
        SubmissionStatus::Rejected => assert_eq!(gift.status, GiftStatus::Pending),
        other => panic!("submission left in {other}"),
    }
}

#[tokio::test]
async fn only_the_sender_may_review() {
    let h = Harness::new();
    let (created, submission_id) = photo_gift_with_submission(&h).await;

    assert_matches!(
        h.lifecycle
            .approvals()
            .review(submission_id, SENDER_ID + 1, ReviewAction::Approve, None)
            .await,
        Err(LifecycleError::Core(CoreError::Forbidden(_)))
    );
    assert_matches!(
        h.lifecycle
            .approvals()
            .history(created.gift.gift.id, SENDER_ID + 1)
            .await,
        Err(LifecycleError::Core(CoreError::Forbidden(_)))
    );
}

#[tokio::test]
async fn overlong_rejection_reason_is_refused() {
    let h = Harness::new();
    let (_, submission_id) = photo_gift_with_submission(&h).await;
    let reason = "x".repeat(501);

    assert_matches!(
        h.lifecycle
            .approvals()
            .review(submission_id, SENDER_ID, ReviewAction::Reject, Some(&reason))
            .await,
        Err(LifecycleError::Core(CoreError::Validation(_)))
    );
}

#[tokio::test]
async fn pending_queue_lists_submissions_for_the_sender() {
    let h = Harness::new();
    let (_, submission_id) = photo_gift_with_submission(&h).await;

    let pending = h
        .lifecycle
        .approvals()
        .pending_for_sender(SENDER_ID)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, submission_id);

    assert!(h
        .lifecycle
        .approvals()
        .pending_for_sender(SENDER_ID + 1)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn cancelled_gift_cannot_be_reviewed() {
    let h = Harness::new();
    let (created, submission_id) = photo_gift_with_submission(&h).await;

    h.lifecycle.cancel(created.gift.gift.id, SENDER_ID).await.unwrap();

    assert_matches!(
        h.lifecycle
            .approvals()
            .review(submission_id, SENDER_ID, ReviewAction::Approve, None)
            .await,
        Err(LifecycleError::Core(CoreError::Conflict(_)))
    );
}

// ---------------------------------------------------------------------------
// Review racing a cancel
// ---------------------------------------------------------------------------

/// Delegates to the memory store, but cancels the gift right before the
/// review decision is written.
struct CancelBeforeReview {
    inner: Arc<MemoryGiftStore>,
}

#[async_trait]
impl GiftStore for CancelBeforeReview {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn create_gift(
        &self,
        gift: &NewGift,
        challenge: &NewChallenge,
    ) -> StoreResult<GiftWithChallenge> {
        self.inner.create_gift(gift, challenge).await
    }

    async fn get_gift(&self, id: DbId) -> StoreResult<Option<Gift>> {
        self.inner.get_gift(id).await
    }

    async fn get_gift_by_tracking_id(&self, tracking_id: Uuid) -> StoreResult<Option<Gift>> {
        self.inner.get_gift_by_tracking_id(tracking_id).await
    }

    async fn list_gifts_for_sender(&self, sender_id: DbId) -> StoreResult<Vec<Gift>> {
        self.inner.list_gifts_for_sender(sender_id).await
    }

    async fn delete_gift(&self, id: DbId) -> StoreResult<bool> {
        self.inner.delete_gift(id).await
    }

    async fn get_challenge(&self, id: DbId) -> StoreResult<Option<Challenge>> {
        self.inner.get_challenge(id).await
    }

    async fn get_challenge_for_gift(&self, gift_id: DbId) -> StoreResult<Option<Challenge>> {
        self.inner.get_challenge_for_gift(gift_id).await
    }

    async fn save_challenge_progress(
        &self,
        update: &ProgressUpdate,
    ) -> StoreResult<GiftWithChallenge> {
        self.inner.save_challenge_progress(update).await
    }

    async fn set_gift_status(
        &self,
        id: DbId,
        from: &[GiftStatus],
        to: GiftStatus,
    ) -> StoreResult<Gift> {
        self.inner.set_gift_status(id, from, to).await
    }

    async fn create_photo_submission(
        &self,
        input: &NewPhotoSubmission,
    ) -> StoreResult<PhotoSubmission> {
        self.inner.create_photo_submission(input).await
    }

    async fn get_photo_submission(&self, id: DbId) -> StoreResult<Option<PhotoSubmission>> {
        self.inner.get_photo_submission(id).await
    }

    async fn list_photo_submissions(&self, gift_id: DbId) -> StoreResult<Vec<PhotoSubmission>> {
        self.inner.list_photo_submissions(gift_id).await
    }

    async fn list_pending_submissions_for_sender(
        &self,
        sender_id: DbId,
    ) -> StoreResult<Vec<PhotoSubmission>> {
        self.inner.list_pending_submissions_for_sender(sender_id).await
    }

    async fn update_photo_submission_status(
        &self,
        id: DbId,
        status: SubmissionStatus,
        reason: Option<&str>,
    ) -> StoreResult<PhotoSubmission> {
        self.inner
            .update_photo_submission_status(id, status, reason)
            .await
    }

    async fn resolve_photo_submission(
        &self,
        id: DbId,
        decision: SubmissionStatus,
        reason: Option<&str>,
    ) -> StoreResult<ResolvedSubmission> {
        if let Some(submission) = self.inner.get_photo_submission(id).await? {
            self.inner
                .set_gift_status(
                    submission.gift_id,
                    &GiftStatus::ACTIVE,
                    GiftStatus::Cancelled,
                )
                .await?;
        }
        self.inner.resolve_photo_submission(id, decision, reason).await
    }

    async fn find_active_gifts_by_recipient_contact(
        &self,
        phone: &str,
    ) -> StoreResult<Vec<GiftWithChallenge>> {
        self.inner.find_active_gifts_by_recipient_contact(phone).await
    }

    async fn find_expired_gifts(&self, now: Timestamp, limit: i64) -> StoreResult<Vec<Gift>> {
        self.inner.find_expired_gifts(now, limit).await
    }

    async fn append_event(
        &self,
        gift_id: DbId,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> StoreResult<GiftEvent> {
        self.inner.append_event(gift_id, event_type, payload).await
    }

    async fn list_events(&self, gift_id: DbId) -> StoreResult<Vec<GiftEvent>> {
        self.inner.list_events(gift_id).await
    }
}

#[tokio::test]
async fn cancel_during_approval_leaves_submission_pending() {
    let mut h = Harness::with_store_layer(|inner| {
        Arc::new(CancelBeforeReview { inner }) as Arc<dyn GiftStore>
    });
    let (created, submission_id) = photo_gift_with_submission(&h).await;
    h.drain_event_types();
    let sms_before = h.sms.sent_to(RECIPIENT_PHONE).len();

    assert_matches!(
        h.lifecycle
            .approvals()
            .review(submission_id, SENDER_ID, ReviewAction::Approve, None)
            .await,
        Err(LifecycleError::Core(CoreError::Conflict(_)))
    );

    let submission = h
        .store()
        .get_photo_submission(submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(submission.status, SubmissionStatus::PendingApproval);
    assert!(submission.reviewed_at.is_none());

    let gift = h.store().get_gift(created.gift.gift.id).await.unwrap().unwrap();
    assert_eq!(gift.status, GiftStatus::Cancelled);
    assert!(!gift.unlocked);
    assert!(gift.unlock_evidence_url.is_none());

    // No decision was announced.
    assert!(!h.drain_event_types().contains(&"submission.approved".to_string()));
    assert_eq!(h.sms.sent_to(RECIPIENT_PHONE).len(), sms_before);
}

#[tokio::test]
async fn cancel_during_rejection_leaves_gift_closed() {
    let h = Harness::with_store_layer(|inner| {
        Arc::new(CancelBeforeReview { inner }) as Arc<dyn GiftStore>
    });
    let (created, submission_id) = photo_gift_with_submission(&h).await;

    assert_matches!(
        h.lifecycle
            .approvals()
            .review(submission_id, SENDER_ID, ReviewAction::Reject, Some("blurry"))
            .await,
        Err(LifecycleError::Core(CoreError::Conflict(_)))
    );

    let submission = h
        .store()
        .get_photo_submission(submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(submission.status, SubmissionStatus::PendingApproval);
    let gift = h.store().get_gift(created.gift.gift.id).await.unwrap().unwrap();
    assert_eq!(gift.status, GiftStatus::Cancelled);
}
