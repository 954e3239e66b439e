//! In-memory [`GiftStore`].
//!
//! All state sits behind one `tokio::sync::Mutex`, held for the full span of
//! each operation, so every method is atomic with the same check-then-write
//! semantics as the PostgreSQL store. Used by tests and local development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use giftlock_core::approval::SubmissionStatus;
use giftlock_core::gift::GiftStatus;
use giftlock_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::challenge::{Challenge, NewChallenge, ProgressUpdate};
use crate::models::gift::{Gift, GiftWithChallenge, NewGift};
use crate::models::gift_event::GiftEvent;
use crate::models::photo_submission::{NewPhotoSubmission, PhotoSubmission, ResolvedSubmission};
use crate::store::{check_gift_transition, gift_status_after_review, new_tracking_id, GiftStore};

#[derive(Default)]
struct Tables {
    next_id: DbId,
    gifts: BTreeMap<DbId, Gift>,
    challenges: BTreeMap<DbId, Challenge>,
    submissions: BTreeMap<DbId, PhotoSubmission>,
    events: BTreeMap<DbId, GiftEvent>,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn challenge_for_gift(&self, gift_id: DbId) -> Option<&Challenge> {
        self.challenges.values().find(|c| c.gift_id == gift_id)
    }

    fn gift_mut(&mut self, id: DbId) -> StoreResult<&mut Gift> {
        self.gifts
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "Gift", id })
    }
}

/// [`GiftStore`] kept entirely in process memory.
#[derive(Default)]
pub struct MemoryGiftStore {
    tables: Mutex<Tables>,
}

impl MemoryGiftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a gift's expiry. Lets tests and local tooling exercise the
    /// expiry sweep without waiting.
    pub async fn set_expires_at(&self, gift_id: DbId, expires_at: Timestamp) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.gift_mut(gift_id)?.expires_at = expires_at;
        Ok(())
    }
}

#[async_trait]
impl GiftStore for MemoryGiftStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_gift(
        &self,
        input: &NewGift,
        challenge: &NewChallenge,
    ) -> StoreResult<GiftWithChallenge> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let gift = Gift {
            id: tables.next_id(),
            tracking_id: new_tracking_id(),
            sender_id: input.sender_id,
            sender_name: input.sender_name.clone(),
            sender_phone: input.sender_phone.clone(),
            sender_email: input.sender_email.clone(),
            recipient_name: input.recipient_name.clone(),
            recipient_phone: input.recipient_phone.clone(),
            recipient_email: input.recipient_email.clone(),
            gift_type: input.gift_type.clone(),
            gift_value: input.gift_value.clone(),
            gift_description: input.gift_description.clone(),
            personal_note: input.personal_note.clone(),
            delivery_method: input.delivery_method,
            status: GiftStatus::Pending,
            unlocked: false,
            unlock_evidence_url: None,
            unlocked_at: None,
            expires_at: input.expires_at,
            created_at: now,
            updated_at: now,
        };

        let challenge = Challenge {
            id: tables.next_id(),
            gift_id: gift.id,
            challenge_type: challenge.challenge_type,
            description: challenge.description.clone(),
            requirements: challenge.requirements.clone(),
            progress: challenge.initial_progress(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        tables.gifts.insert(gift.id, gift.clone());
        tables.challenges.insert(challenge.id, challenge.clone());
        Ok(GiftWithChallenge { gift, challenge })
    }

    async fn get_gift(&self, id: DbId) -> StoreResult<Option<Gift>> {
        Ok(self.tables.lock().await.gifts.get(&id).cloned())
    }

    async fn get_gift_by_tracking_id(&self, tracking_id: Uuid) -> StoreResult<Option<Gift>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .gifts
            .values()
            .find(|g| g.tracking_id == tracking_id)
            .cloned())
    }

    async fn list_gifts_for_sender(&self, sender_id: DbId) -> StoreResult<Vec<Gift>> {
        let tables = self.tables.lock().await;
        let mut gifts: Vec<Gift> = tables
            .gifts
            .values()
            .filter(|g| g.sender_id == sender_id)
            .cloned()
            .collect();
        gifts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(gifts)
    }

    async fn delete_gift(&self, id: DbId) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.gifts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.challenges.retain(|_, c| c.gift_id != id);
        tables.submissions.retain(|_, s| s.gift_id != id);
        tables.events.retain(|_, e| e.gift_id != id);
        Ok(true)
    }

    async fn get_challenge(&self, id: DbId) -> StoreResult<Option<Challenge>> {
        Ok(self.tables.lock().await.challenges.get(&id).cloned())
    }

    async fn get_challenge_for_gift(&self, gift_id: DbId) -> StoreResult<Option<Challenge>> {
        Ok(self.tables.lock().await.challenge_for_gift(gift_id).cloned())
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

        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let current = tables
            .challenges
            .get(&update.challenge_id)
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
        let gift_id = current.gift_id;

        let gift = tables.gift_mut(gift_id)?;
        check_gift_transition(gift, &GiftStatus::ACTIVE, update.gift_status)?;
        gift.status = update.gift_status;
        if update.unlock {
            gift.unlocked = true;
            gift.unlocked_at = Some(now);
        }
        gift.updated_at = now;
        let gift = gift.clone();

        let challenge = tables
            .challenges
            .get_mut(&update.challenge_id)
            .ok_or(StoreError::NotFound {
                entity: "Challenge",
                id: update.challenge_id,
            })?;
        challenge.progress = update.progress.clone();
        challenge.version += 1;
        challenge.updated_at = now;
        let challenge = challenge.clone();

        Ok(GiftWithChallenge { gift, challenge })
    }

    async fn set_gift_status(
        &self,
        id: DbId,
        from: &[GiftStatus],
        to: GiftStatus,
    ) -> StoreResult<Gift> {
        let mut tables = self.tables.lock().await;
        let gift = tables.gift_mut(id)?;
        check_gift_transition(gift, from, to)?;
        gift.status = to;
        gift.updated_at = Utc::now();
        Ok(gift.clone())
    }

    async fn create_photo_submission(
        &self,
        input: &NewPhotoSubmission,
    ) -> StoreResult<PhotoSubmission> {
        let mut tables = self.tables.lock().await;

        if !tables.gifts.contains_key(&input.gift_id) {
            return Err(StoreError::NotFound {
                entity: "Gift",
                id: input.gift_id,
            });
        }
        if tables
            .submissions
            .values()
            .any(|s| s.gift_id == input.gift_id && s.status.is_pending())
        {
            return Err(StoreError::Conflict(format!(
                "Gift {} already has a submission awaiting review",
                input.gift_id
            )));
        }

        let submission = PhotoSubmission {
            id: tables.next_id(),
            challenge_id: input.challenge_id,
            gift_id: input.gift_id,
            media_url: input.media_url.clone(),
            media_content_type: input.media_content_type.clone(),
            submitter_contact: input.submitter_contact.clone(),
            status: SubmissionStatus::PendingApproval,
            rejection_reason: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        };
        tables.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn get_photo_submission(&self, id: DbId) -> StoreResult<Option<PhotoSubmission>> {
        Ok(self.tables.lock().await.submissions.get(&id).cloned())
    }

    async fn list_photo_submissions(&self, gift_id: DbId) -> StoreResult<Vec<PhotoSubmission>> {
        let tables = self.tables.lock().await;
        let mut submissions: Vec<PhotoSubmission> = tables
            .submissions
            .values()
            .filter(|s| s.gift_id == gift_id)
            .cloned()
            .collect();
        submissions.sort_by(|a, b| (b.submitted_at, b.id).cmp(&(a.submitted_at, a.id)));
        Ok(submissions)
    }

    async fn list_pending_submissions_for_sender(
        &self,
        sender_id: DbId,
    ) -> StoreResult<Vec<PhotoSubmission>> {
        let tables = self.tables.lock().await;
        let mut submissions: Vec<PhotoSubmission> = tables
            .submissions
            .values()
            .filter(|s| s.status.is_pending())
            .filter(|s| {
                tables
                    .gifts
                    .get(&s.gift_id)
                    .is_some_and(|g| g.sender_id == sender_id)
            })
            .cloned()
            .collect();
        submissions.sort_by(|a, b| (a.submitted_at, a.id).cmp(&(b.submitted_at, b.id)));
        Ok(submissions)
    }

    async fn update_photo_submission_status(
        &self,
        id: DbId,
        status: SubmissionStatus,
        reason: Option<&str>,
    ) -> StoreResult<PhotoSubmission> {
        let mut tables = self.tables.lock().await;
        let submission = tables
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "PhotoSubmission",
                id,
            })?;
        if !submission.status.is_pending() {
            return Err(StoreError::Conflict(format!(
                "Submission {id} was already {}",
                submission.status
            )));
        }
        submission.status = status;
        submission.rejection_reason = reason.map(str::to_string);
        submission.reviewed_at = Some(Utc::now());
        Ok(submission.clone())
    }

    async fn resolve_photo_submission(
        &self,
        id: DbId,
        decision: SubmissionStatus,
        reason: Option<&str>,
    ) -> StoreResult<ResolvedSubmission> {
        let to = gift_status_after_review(decision)?;
        let mut tables = self.tables.lock().await;

        let current = tables
            .submissions
            .get(&id)
            .cloned()
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

        let now = Utc::now();
        let gift = tables.gift_mut(current.gift_id)?;
        check_gift_transition(gift, &[GiftStatus::PendingApproval], to)?;
        gift.status = to;
        gift.updated_at = now;
        if decision == SubmissionStatus::Approved {
            gift.unlocked = true;
            gift.unlocked_at = Some(now);
            gift.unlock_evidence_url = Some(current.media_url.clone());
        }
        let gift = gift.clone();

        let submission = tables
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "PhotoSubmission",
                id,
            })?;
        submission.status = decision;
        submission.rejection_reason = reason.map(str::to_string);
        submission.reviewed_at = Some(now);

        Ok(ResolvedSubmission {
            submission: submission.clone(),
            gift,
        })
    }

    async fn find_active_gifts_by_recipient_contact(
        &self,
        phone: &str,
    ) -> StoreResult<Vec<GiftWithChallenge>> {
        let tables = self.tables.lock().await;
        let mut gifts: Vec<&Gift> = tables
            .gifts
            .values()
            .filter(|g| g.is_active() && g.recipient_phone.as_deref() == Some(phone))
            .collect();
        gifts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(gifts
            .into_iter()
            .filter_map(|gift| {
                tables
                    .challenge_for_gift(gift.id)
                    .map(|challenge| GiftWithChallenge {
                        gift: gift.clone(),
                        challenge: challenge.clone(),
                    })
            })
            .collect())
    }

    async fn find_expired_gifts(&self, now: Timestamp, limit: i64) -> StoreResult<Vec<Gift>> {
        let tables = self.tables.lock().await;
        let mut gifts: Vec<Gift> = tables
            .gifts
            .values()
            .filter(|g| g.is_expired_at(now))
            .cloned()
            .collect();
        gifts.sort_by_key(|g| g.expires_at);
        gifts.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(gifts)
    }

    async fn append_event(
        &self,
        gift_id: DbId,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> StoreResult<GiftEvent> {
        let mut tables = self.tables.lock().await;
        if !tables.gifts.contains_key(&gift_id) {
            return Err(StoreError::NotFound {
                entity: "Gift",
                id: gift_id,
            });
        }
        let event = GiftEvent {
            id: tables.next_id(),
            gift_id,
            event_type: event_type.to_string(),
            payload: payload.clone(),
            created_at: Utc::now(),
        };
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn list_events(&self, gift_id: DbId) -> StoreResult<Vec<GiftEvent>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .events
            .values()
            .filter(|e| e.gift_id == gift_id)
            .cloned()
            .collect())
    }
}
