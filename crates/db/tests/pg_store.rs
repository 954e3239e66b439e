//! Integration tests for `PgGiftStore` against a real database.
//!
//! These need `DATABASE_URL` pointing at a PostgreSQL server the test user
//! can create databases on, so they are ignored by default. Run with
//! `cargo test -p giftlock-db -- --ignored`.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use giftlock_core::approval::SubmissionStatus;
use giftlock_core::challenge::{ChallengeRequirements, ChallengeType};
use giftlock_core::gift::{DeliveryMethod, GiftStatus};
use giftlock_db::models::challenge::{NewChallenge, ProgressUpdate};
use giftlock_db::models::gift::NewGift;
use giftlock_db::models::photo_submission::NewPhotoSubmission;
use giftlock_db::{GiftStore, PgGiftStore, StoreError};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_gift(phone: &str) -> NewGift {
    NewGift {
        sender_id: 7,
        sender_name: "Sam".to_string(),
        sender_phone: Some("+15550009999".to_string()),
        sender_email: None,
        recipient_name: Some("Alex".to_string()),
        recipient_phone: Some(phone.to_string()),
        recipient_email: None,
        gift_type: "coffee".to_string(),
        gift_value: Some("$5".to_string()),
        gift_description: None,
        personal_note: None,
        delivery_method: DeliveryMethod::Sms,
        expires_at: Utc::now() + Duration::days(7),
    }
}

fn photo_challenge() -> NewChallenge {
    NewChallenge {
        challenge_type: ChallengeType::Photo,
        description: "Show me your breakfast".to_string(),
        requirements: ChallengeRequirements::default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_health_check(pool: PgPool) {
    giftlock_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_fetch_gift(pool: PgPool) {
    let store = PgGiftStore::new(pool);
    let created = store
        .create_gift(&new_gift("+15550000001"), &photo_challenge())
        .await
        .unwrap();

    assert_eq!(created.gift.status, GiftStatus::Pending);
    assert_eq!(created.challenge.progress.total_steps, 1);

    let by_tracking = store
        .get_gift_by_tracking_id(created.gift.tracking_id)
        .await
        .unwrap()
        .expect("gift should be found by tracking id");
    assert_eq!(by_tracking.id, created.gift.id);

    let challenge = store
        .get_challenge_for_gift(created.gift.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(challenge.challenge_type, ChallengeType::Photo);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_progress_cas_rejects_stale_version(pool: PgPool) {
    let store = PgGiftStore::new(pool);
    let created = store
        .create_gift(&new_gift("+15550000001"), &photo_challenge())
        .await
        .unwrap();

    let mut progress = created.challenge.progress.clone();
    progress.started = true;
    let update = ProgressUpdate {
        challenge_id: created.challenge.id,
        expected_version: 0,
        progress,
        gift_status: GiftStatus::InProgress,
        unlock: false,
    };

    let saved = store.save_challenge_progress(&update).await.unwrap();
    assert_eq!(saved.challenge.version, 1);
    assert_eq!(saved.gift.status, GiftStatus::InProgress);

    assert_matches!(
        store.save_challenge_progress(&update).await,
        Err(StoreError::StaleVersion { .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_second_pending_submission_conflicts(pool: PgPool) {
    let store = PgGiftStore::new(pool);
    let created = store
        .create_gift(&new_gift("+15550000001"), &photo_challenge())
        .await
        .unwrap();
    let input = NewPhotoSubmission {
        challenge_id: created.challenge.id,
        gift_id: created.gift.id,
        media_url: "https://media.test/a.jpg".to_string(),
        media_content_type: Some("image/jpeg".to_string()),
        submitter_contact: "+15550000001".to_string(),
    };

    let first = store.create_photo_submission(&input).await.unwrap();
    assert_eq!(first.status, SubmissionStatus::PendingApproval);
    assert_matches!(
        store.create_photo_submission(&input).await,
        Err(StoreError::Conflict(_))
    );

    let approved = store
        .update_photo_submission_status(first.id, SubmissionStatus::Approved, None)
        .await
        .unwrap();
    assert!(approved.reviewed_at.is_some());
    assert_matches!(
        store
            .update_photo_submission_status(first.id, SubmissionStatus::Rejected, None)
            .await,
        Err(StoreError::Conflict(_))
    );
}

async fn submission_awaiting_review(store: &PgGiftStore) -> (i64, i64) {
    let created = store
        .create_gift(&new_gift("+15550000001"), &photo_challenge())
        .await
        .unwrap();
    let submission = store
        .create_photo_submission(&NewPhotoSubmission {
            challenge_id: created.challenge.id,
            gift_id: created.gift.id,
            media_url: "https://media.test/a.jpg".to_string(),
            media_content_type: Some("image/jpeg".to_string()),
            submitter_contact: "+15550000001".to_string(),
        })
        .await
        .unwrap();
    store
        .set_gift_status(
            created.gift.id,
            &[GiftStatus::Pending],
            GiftStatus::PendingApproval,
        )
        .await
        .unwrap();
    (created.gift.id, submission.id)
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_approval_unlocks_and_gift_becomes_terminal(pool: PgPool) {
    let store = PgGiftStore::new(pool);
    let (gift_id, submission_id) = submission_awaiting_review(&store).await;

    let resolved = store
        .resolve_photo_submission(submission_id, SubmissionStatus::Approved, None)
        .await
        .unwrap();
    assert_eq!(resolved.submission.status, SubmissionStatus::Approved);
    assert!(resolved.gift.unlocked);
    assert_eq!(resolved.gift.status, GiftStatus::Completed);
    assert_eq!(
        resolved.gift.unlock_evidence_url.as_deref(),
        Some("https://media.test/a.jpg")
    );

    assert_matches!(
        store
            .set_gift_status(gift_id, &GiftStatus::ACTIVE, GiftStatus::Cancelled)
            .await,
        Err(StoreError::Conflict(_))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_review_of_cancelled_gift_writes_nothing(pool: PgPool) {
    let store = PgGiftStore::new(pool);
    let (gift_id, submission_id) = submission_awaiting_review(&store).await;
    store
        .set_gift_status(gift_id, &GiftStatus::ACTIVE, GiftStatus::Cancelled)
        .await
        .unwrap();

    assert_matches!(
        store
            .resolve_photo_submission(submission_id, SubmissionStatus::Approved, None)
            .await,
        Err(StoreError::Conflict(_))
    );

    let submission = store.get_photo_submission(submission_id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::PendingApproval);
    let gift = store.get_gift(gift_id).await.unwrap().unwrap();
    assert!(!gift.unlocked);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_event_for_deleted_gift_is_not_found(pool: PgPool) {
    let store = PgGiftStore::new(pool);
    let created = store
        .create_gift(&new_gift("+15550000001"), &photo_challenge())
        .await
        .unwrap();
    assert!(store.delete_gift(created.gift.id).await.unwrap());

    assert_matches!(
        store
            .append_event(created.gift.id, "gift.cancelled", &serde_json::json!({}))
            .await,
        Err(StoreError::NotFound { entity: "Gift", .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_active_lookup_and_cascade_delete(pool: PgPool) {
    let store = PgGiftStore::new(pool);
    let phone = "+15550000001";
    let older = store.create_gift(&new_gift(phone), &photo_challenge()).await.unwrap();
    let newer = store.create_gift(&new_gift(phone), &photo_challenge()).await.unwrap();

    let active = store.find_active_gifts_by_recipient_contact(phone).await.unwrap();
    let ids: Vec<i64> = active.iter().map(|a| a.gift.id).collect();
    assert_eq!(ids, vec![newer.gift.id, older.gift.id]);

    store
        .append_event(older.gift.id, "gift.created", &serde_json::json!({"n": 1}))
        .await
        .unwrap();
    assert!(store.delete_gift(older.gift.id).await.unwrap());
    assert!(store.get_challenge(older.challenge.id).await.unwrap().is_none());
    assert!(store.list_events(older.gift.id).await.unwrap().is_empty());
}
