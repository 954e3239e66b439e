//! PostgreSQL-backed [`GiftStore`].
//!
//! Each state-changing method runs in one transaction and takes row locks
//! (`SELECT ... FOR UPDATE`) on the rows it checks before writing them.

use std::collections::HashMap;

use async_trait::async_trait;
use giftlock_core::approval::SubmissionStatus;
use giftlock_core::gift::GiftStatus;
use giftlock_core::types::{DbId, Timestamp};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::challenge::{Challenge, NewChallenge, ProgressUpdate};
use crate::models::gift::{Gift, GiftWithChallenge, NewGift};
use crate::models::gift_event::GiftEvent;
use crate::models::photo_submission::{NewPhotoSubmission, PhotoSubmission, ResolvedSubmission};
use crate::repositories::photo_submission_repo::PENDING_UNIQUE_CONSTRAINT;
use crate::repositories::{ChallengeRepo, GiftEventRepo, GiftRepo, PhotoSubmissionRepo};
use crate::store::{check_gift_transition, gift_status_after_review, new_tracking_id, GiftStore};
use crate::DbPool;

/// [`GiftStore`] over a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgGiftStore {
    pool: DbPool,
}

impl PgGiftStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Whether `err` is a unique violation on the named constraint.
fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// Whether `err` is a foreign key violation, e.g. a row referencing a
/// deleted gift.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}

#[async_trait]
impl GiftStore for PgGiftStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_gift(
        &self,
        gift: &NewGift,
        challenge: &NewChallenge,
    ) -> StoreResult<GiftWithChallenge> {
        let mut tx = self.pool.begin().await?;
        let gift = GiftRepo::create(&mut *tx, gift, new_tracking_id()).await?;
        let challenge = ChallengeRepo::create(&mut *tx, gift.id, challenge).await?;
        tx.commit().await?;
        Ok(GiftWithChallenge { gift, challenge })
    }

    async fn get_gift(&self, id: DbId) -> StoreResult<Option<Gift>> {
        Ok(GiftRepo::find_by_id(&self.pool, id).await?)
    }

    async fn get_gift_by_tracking_id(&self, tracking_id: Uuid) -> StoreResult<Option<Gift>> {
        Ok(GiftRepo::find_by_tracking_id(&self.pool, tracking_id).await?)
    }

    async fn list_gifts_for_sender(&self, sender_id: DbId) -> StoreResult<Vec<Gift>> {
        Ok(GiftRepo::list_for_sender(&self.pool, sender_id).await?)
    }

    async fn delete_gift(&self, id: DbId) -> StoreResult<bool> {
        Ok(GiftRepo::delete(&self.pool, id).await?)
    }

    async fn get_challenge(&self, id: DbId) -> StoreResult<Option<Challenge>> {
        Ok(ChallengeRepo::find_by_id(&self.pool, id).await?)
    }

    async fn get_challenge_for_gift(&self, gift_id: DbId) -> StoreResult<Option<Challenge>> {
        Ok(ChallengeRepo::find_by_gift_id(&self.pool, gift_id).await?)
    }

    async fn save_challenge_progress(
        &self,
        update: &ProgressUpdate,
    ) -> StoreResult<GiftWithChallenge> {
        if update.unlock && update.gift_status != GiftStatus::Completed {
            return Err(StoreError::Conflict(format!(
                "Challenge {} cannot unlock its gift without completing it",
                update.challenge_id
            )));
        }

        let mut tx = self.pool.begin().await?;

        let current = ChallengeRepo::find_by_id_for_update(&mut *tx, update.challenge_id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "Challenge",
                id: update.challenge_id,
            })?;
        if current.version != update.expected_version {
            return Err(StoreError::StaleVersion {
                entity: "Challenge",
                id: update.challenge_id,
            });
        }

        let gift = GiftRepo::find_by_id_for_update(&mut *tx, current.gift_id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "Gift",
                id: current.gift_id,
            })?;
        check_gift_transition(&gift, &GiftStatus::ACTIVE, update.gift_status)?;

        let challenge = ChallengeRepo::update_progress(
            &mut *tx,
            update.challenge_id,
            &update.progress,
            update.expected_version,
        )
        .await?
        .ok_or(StoreError::StaleVersion {
            entity: "Challenge",
            id: update.challenge_id,
        })?;

        let gift = if update.unlock {
            GiftRepo::mark_unlocked(&mut *tx, gift.id, None).await?
        } else {
            GiftRepo::update_status(&mut *tx, gift.id, update.gift_status).await?
        };

        tx.commit().await?;
        Ok(GiftWithChallenge { gift, challenge })
    }

    async fn set_gift_status(
        &self,
        id: DbId,
        from: &[GiftStatus],
        to: GiftStatus,
    ) -> StoreResult<Gift> {
        let mut tx = self.pool.begin().await?;
        let gift = GiftRepo::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound { entity: "Gift", id })?;
        check_gift_transition(&gift, from, to)?;
        let gift = GiftRepo::update_status(&mut *tx, id, to).await?;
        tx.commit().await?;
        Ok(gift)
    }

    async fn create_photo_submission(
        &self,
        input: &NewPhotoSubmission,
    ) -> StoreResult<PhotoSubmission> {
        PhotoSubmissionRepo::create(&self.pool, input)
            .await
            .map_err(|e| {
                if is_unique_violation(&e, PENDING_UNIQUE_CONSTRAINT) {
                    StoreError::Conflict(format!(
                        "Gift {} already has a submission awaiting review",
                        input.gift_id
                    ))
                } else {
                    StoreError::Database(e)
                }
            })
    }

    async fn get_photo_submission(&self, id: DbId) -> StoreResult<Option<PhotoSubmission>> {
        Ok(PhotoSubmissionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_photo_submissions(&self, gift_id: DbId) -> StoreResult<Vec<PhotoSubmission>> {
        Ok(PhotoSubmissionRepo::list_for_gift(&self.pool, gift_id).await?)
    }

    async fn list_pending_submissions_for_sender(
        &self,
        sender_id: DbId,
    ) -> StoreResult<Vec<PhotoSubmission>> {
        Ok(PhotoSubmissionRepo::list_pending_for_sender(&self.pool, sender_id).await?)
    }

    async fn update_photo_submission_status(
        &self,
        id: DbId,
        status: SubmissionStatus,
        reason: Option<&str>,
    ) -> StoreResult<PhotoSubmission> {
        let mut tx = self.pool.begin().await?;
        let current = PhotoSubmissionRepo::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "PhotoSubmission",
                id,
            })?;
        if !current.status.is_pending() {
            return Err(StoreError::Conflict(format!(
                "Submission {id} was already {}",
                current.status
            )));
        }
        let updated = PhotoSubmissionRepo::update_status(&mut *tx, id, status, reason).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn resolve_photo_submission(
        &self,
        id: DbId,
        decision: SubmissionStatus,
        reason: Option<&str>,
    ) -> StoreResult<ResolvedSubmission> {
        let to = gift_status_after_review(decision)?;
        let mut tx = self.pool.begin().await?;

        // Lock order: gift row, then submission row.
        let gift_id = PhotoSubmissionRepo::find_by_id(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "PhotoSubmission",
                id,
            })?
            .gift_id;
        let gift = GiftRepo::find_by_id_for_update(&mut *tx, gift_id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "Gift",
                id: gift_id,
            })?;
        let current = PhotoSubmissionRepo::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "PhotoSubmission",
                id,
            })?;
        if !current.status.is_pending() {
            return Err(StoreError::Conflict(format!(
                "Submission {id} was already {}",
                current.status
            )));
        }
        check_gift_transition(&gift, &[GiftStatus::PendingApproval], to)?;

        let submission = PhotoSubmissionRepo::update_status(&mut *tx, id, decision, reason).await?;
        let gift = if decision == SubmissionStatus::Approved {
            GiftRepo::mark_unlocked(&mut *tx, gift.id, Some(&submission.media_url)).await?
        } else {
            GiftRepo::update_status(&mut *tx, gift.id, to).await?
        };

        tx.commit().await?;
        Ok(ResolvedSubmission { submission, gift })
    }

    async fn find_active_gifts_by_recipient_contact(
        &self,
        phone: &str,
    ) -> StoreResult<Vec<GiftWithChallenge>> {
        let gifts = GiftRepo::list_active_for_recipient_phone(&self.pool, phone).await?;
        if gifts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<DbId> = gifts.iter().map(|g| g.id).collect();
        let mut challenges: HashMap<DbId, Challenge> =
            ChallengeRepo::list_for_gifts(&self.pool, &ids)
                .await?
                .into_iter()
                .map(|c| (c.gift_id, c))
                .collect();

        Ok(gifts
            .into_iter()
            .filter_map(|gift| {
                let challenge = challenges.remove(&gift.id);
                if challenge.is_none() {
                    tracing::warn!(gift_id = gift.id, "Active gift has no challenge");
                }
                challenge.map(|challenge| GiftWithChallenge { gift, challenge })
            })
            .collect())
    }

    async fn find_expired_gifts(&self, now: Timestamp, limit: i64) -> StoreResult<Vec<Gift>> {
        Ok(GiftRepo::list_expired(&self.pool, now, limit).await?)
    }

    async fn append_event(
        &self,
        gift_id: DbId,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> StoreResult<GiftEvent> {
        GiftEventRepo::insert(&self.pool, gift_id, event_type, payload)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::NotFound {
                        entity: "Gift",
                        id: gift_id,
                    }
                } else {
                    StoreError::Database(e)
                }
            })
    }

    async fn list_events(&self, gift_id: DbId) -> StoreResult<Vec<GiftEvent>> {
        Ok(GiftEventRepo::list_for_gift(&self.pool, gift_id).await?)
    }
}
