//! Gift/Challenge State Machine.
//!
//! Owns every transition of `Gift.status` and of the challenge progress
//! record:
//!
//! ```text
//! pending -> notified -> in_progress -> completed
//!    |          |            |
//!    +----------+------------+--> pending_approval -> completed   (approve)
//!                                        |
//!                                        +--------> pending       (reject)
//!
//! any non-terminal state -> expired | cancelled
//! ```
//!
//! Progress writes go through `GiftStore::save_challenge_progress`, which
//! compare-and-swaps on the challenge version. A lost race re-reads and
//! recomputes, up to [`MAX_PROGRESS_ATTEMPTS`] times.

use chrono::Utc;
use giftlock_core::approval::SubmissionStatus;
use giftlock_core::challenge::{
    ChallengeRequirements, ChallengeType, StepOutcome, SubmissionKind, SubmissionRecord,
};
use giftlock_core::contact::{is_plausible_email, normalize_phone, ContactInfo};
use giftlock_core::error::CoreError;
use giftlock_core::gift::{DeliveryMethod, GiftStatus};
use giftlock_core::templates::TemplateKind;
use giftlock_core::types::{DbId, Timestamp};
use giftlock_core::validator::{validate, SubmissionContent};
use giftlock_db::models::challenge::{Challenge, NewChallenge, ProgressUpdate};
use giftlock_db::models::gift::{Gift, GiftWithChallenge, NewGift};
use giftlock_db::models::photo_submission::{NewPhotoSubmission, PhotoSubmission};
use giftlock_db::StoreError;
use giftlock_events::{event_types, Audience, DispatchReport, LifecycleEvent};
use serde::Serialize;

use crate::approval::ApprovalWorkflow;
use crate::context::{ensure_owner, LifecycleContext};
use crate::error::{LifecycleError, LifecycleResult};

/// Attempts at a progress write before giving up with `Conflict`.
pub const MAX_PROGRESS_ATTEMPTS: usize = 3;

/// Statuses from which a photo/video submission may be lodged.
const SUBMITTABLE_FOR_APPROVAL: [GiftStatus; 3] =
    [GiftStatus::Pending, GiftStatus::Notified, GiftStatus::InProgress];

/// Reason recorded when a submission loses a race with cancellation/expiry.
const GIFT_CLOSED_REASON: &str = "Gift is no longer accepting submissions";

// ---------------------------------------------------------------------------
// Inputs and outcomes
// ---------------------------------------------------------------------------

/// The authenticated sender creating or managing gifts.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub user_id: DbId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateGiftInput {
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_email: Option<String>,
    pub gift_type: String,
    pub gift_value: Option<String>,
    pub gift_description: Option<String>,
    pub personal_note: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub challenge_type: ChallengeType,
    pub challenge_description: String,
    pub requirements: ChallengeRequirements,
    /// Defaults to creation time plus the configured gift lifetime.
    pub expires_at: Option<Timestamp>,
}

/// A freshly created gift and the result of its initial notification.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedGift {
    #[serde(flatten)]
    pub gift: GiftWithChallenge,
    pub notification: DispatchReport,
}

/// Where a submission came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOrigin {
    /// Inbound SMS from this number. The recipient gets the outcome as the
    /// synchronous reply, so SMS notifications for it are suppressed.
    Sms { from: String },
    /// The recipient app, addressed by tracking id.
    App,
    /// The sender confirming a step of a `custom`/`multi-day` challenge.
    SenderConfirmation { user_id: DbId },
}

impl SubmissionOrigin {
    fn channel(&self) -> &'static str {
        match self {
            SubmissionOrigin::Sms { .. } => "sms",
            SubmissionOrigin::App => "app",
            SubmissionOrigin::SenderConfirmation { .. } => "sender",
        }
    }

    fn actor(&self) -> Option<DbId> {
        match self {
            SubmissionOrigin::SenderConfirmation { user_id } => Some(*user_id),
            _ => None,
        }
    }

    fn notification_audience(&self) -> Audience {
        match self {
            SubmissionOrigin::Sms { .. } => Audience::RecipientExceptSms,
            _ => Audience::Recipient,
        }
    }
}

/// What a submission did.
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// A step was counted; more remain.
    Advanced(GiftWithChallenge),
    /// The final step was counted and the gift unlocked.
    Completed(GiftWithChallenge),
    /// A photo/video now awaits the sender's review.
    AwaitingApproval {
        gift: Gift,
        challenge: Challenge,
        submission: PhotoSubmission,
    },
    /// A previous photo/video is still awaiting review; nothing changed.
    AlreadyAwaitingReview,
    /// The content does not satisfy the challenge; nothing changed.
    Invalid,
    /// The gift is no longer active; nothing changed.
    Inactive,
}

// ---------------------------------------------------------------------------
// GiftLifecycle
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct GiftLifecycle {
    pub(crate) ctx: LifecycleContext,
    approvals: ApprovalWorkflow,
}

impl GiftLifecycle {
    pub fn new(ctx: LifecycleContext) -> Self {
        let approvals = ApprovalWorkflow::new(ctx.clone());
        Self { ctx, approvals }
    }

    pub fn context(&self) -> &LifecycleContext {
        &self.ctx
    }

    pub fn approvals(&self) -> &ApprovalWorkflow {
        &self.approvals
    }

    /* ----------------------------------------------------------------------
    Creation and sender actions
    ---------------------------------------------------------------------- */

    /// Create a gift with its challenge, then send the initial notification.
    /// Success on any channel advances the gift to `notified`.
    pub async fn create_gift(
        &self,
        sender: &SenderIdentity,
        input: CreateGiftInput,
    ) -> LifecycleResult<CreatedGift> {
        let (new_gift, new_challenge) = self.prepare_gift(sender, input)?;
        let keyword_missing = new_challenge.challenge_type == ChallengeType::Keyword
            && new_challenge.requirements.keyword().is_none();

        let created = self.ctx.store.create_gift(&new_gift, &new_challenge).await?;
        let gift_id = created.gift.id;

        tracing::info!(
            gift_id,
            challenge_id = created.challenge.id,
            challenge_type = %created.challenge.challenge_type,
            sender_id = sender.user_id,
            "Gift created"
        );
        self.ctx.publish(
            LifecycleEvent::new(event_types::GIFT_CREATED, gift_id)
                .with_actor(sender.user_id)
                .with_payload(serde_json::json!({
                    "challenge_type": created.challenge.challenge_type,
                    "total_steps": created.challenge.progress.total_steps,
                    "delivery_method": created.gift.delivery_method,
                    "expires_at": created.gift.expires_at,
                })),
        );

        if keyword_missing {
            tracing::warn!(
                gift_id,
                challenge_id = created.challenge.id,
                "Keyword challenge created without a keyword, no reply can complete it"
            );
            self.ctx.publish(
                LifecycleEvent::new(event_types::CHALLENGE_KEYWORD_MISSING, gift_id)
                    .with_actor(sender.user_id),
            );
        }

        let (gift, notification) = self
            .send_initial_notification(created.gift, &created.challenge)
            .await?;
        Ok(CreatedGift {
            gift: GiftWithChallenge {
                gift,
                challenge: created.challenge,
            },
            notification,
        })
    }

    fn prepare_gift(
        &self,
        sender: &SenderIdentity,
        input: CreateGiftInput,
    ) -> Result<(NewGift, NewChallenge), CoreError> {
        let sender_name = required_text("sender name", &sender.name)?;
        let gift_type = required_text("gift type", &input.gift_type)?;
        let description = required_text("challenge description", &input.challenge_description)?;

        let recipient = ContactInfo::parse(
            "recipient",
            input.recipient_phone.as_deref(),
            input.recipient_email.as_deref(),
        )?;
        let (sender_phone, sender_email) = optional_contact(sender)?;

        if input.requirements.total_steps.is_some_and(|n| n < 1) {
            return Err(CoreError::Validation(
                "total_steps must be at least 1".to_string(),
            ));
        }
        if input.requirements.days.is_some_and(|n| n < 1) {
            return Err(CoreError::Validation("days must be at least 1".to_string()));
        }

        let now = Utc::now();
        let expires_at = input
            .expires_at
            .unwrap_or(now + self.ctx.settings.default_gift_lifetime);
        if expires_at <= now {
            return Err(CoreError::Validation(
                "expires_at must be in the future".to_string(),
            ));
        }

        let gift = NewGift {
            sender_id: sender.user_id,
            sender_name,
            sender_phone,
            sender_email,
            recipient_name: non_blank(input.recipient_name),
            recipient_phone: recipient.phone,
            recipient_email: recipient.email,
            gift_type,
            gift_value: non_blank(input.gift_value),
            gift_description: non_blank(input.gift_description),
            personal_note: non_blank(input.personal_note),
            delivery_method: input.delivery_method,
            expires_at,
        };
        let challenge = NewChallenge {
            challenge_type: input.challenge_type,
            description,
            requirements: input.requirements,
        };
        Ok((gift, challenge))
    }

    async fn send_initial_notification(
        &self,
        gift: Gift,
        challenge: &Challenge,
    ) -> LifecycleResult<(Gift, DispatchReport)> {
        let data = self.ctx.template_data(&gift, challenge);
        let report = self
            .ctx
            .gateway
            .send(&gift, TemplateKind::GiftReceived, &data)
            .await;

        if !report.succeeded() {
            tracing::warn!(gift_id = gift.id, "Initial notification reached no channel");
            return Ok((gift, report));
        }
        if gift.status != GiftStatus::Pending {
            return Ok((gift, report));
        }

        match self
            .ctx
            .store
            .set_gift_status(gift.id, &[GiftStatus::Pending], GiftStatus::Notified)
            .await
        {
            Ok(notified) => {
                self.ctx.publish(
                    LifecycleEvent::new(event_types::GIFT_NOTIFIED, notified.id)
                        .with_payload(serde_json::json!({ "channels": &report })),
                );
                Ok((notified, report))
            }
            // The recipient already acted on the message.
            Err(StoreError::Conflict(_)) => Ok((self.ctx.load_gift(gift.id).await?, report)),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-send the initial notification for a gift still in `pending` or
    /// `notified`.
    pub async fn resend_notification(
        &self,
        gift_id: DbId,
        sender_id: DbId,
    ) -> LifecycleResult<CreatedGift> {
        let current = self.ctx.load_owned(gift_id, sender_id).await?;
        if !matches!(
            current.gift.status,
            GiftStatus::Pending | GiftStatus::Notified
        ) {
            return Err(CoreError::Conflict(format!(
                "Gift {gift_id} is '{}', notifications can only be resent before the recipient starts",
                current.gift.status
            ))
            .into());
        }

        let (gift, notification) = self
            .send_initial_notification(current.gift, &current.challenge)
            .await?;
        self.ctx.publish(
            LifecycleEvent::new(event_types::GIFT_RESENT, gift_id)
                .with_actor(sender_id)
                .with_payload(serde_json::json!({ "channels": &notification })),
        );

        Ok(CreatedGift {
            gift: GiftWithChallenge {
                gift,
                challenge: current.challenge,
            },
            notification,
        })
    }

    /// Cancel a non-terminal gift.
    pub async fn cancel(&self, gift_id: DbId, sender_id: DbId) -> LifecycleResult<Gift> {
        let gift = self.ctx.load_gift(gift_id).await?;
        ensure_owner(&gift, sender_id)?;

        let cancelled = self
            .ctx
            .store
            .set_gift_status(gift_id, &GiftStatus::ACTIVE, GiftStatus::Cancelled)
            .await?;

        tracing::info!(gift_id, from = %gift.status, "Gift cancelled");
        self.ctx.publish(
            LifecycleEvent::new(event_types::GIFT_CANCELLED, gift_id)
                .with_actor(sender_id)
                .with_payload(serde_json::json!({ "from": gift.status })),
        );
        Ok(cancelled)
    }

    /// Delete a gift together with its challenge, submissions, and events.
    pub async fn delete(&self, gift_id: DbId, sender_id: DbId) -> LifecycleResult<()> {
        let gift = self.ctx.load_gift(gift_id).await?;
        ensure_owner(&gift, sender_id)?;

        if !self.ctx.store.delete_gift(gift_id).await? {
            return Err(CoreError::NotFound {
                entity: "Gift",
                id: gift_id,
            }
            .into());
        }
        tracing::info!(gift_id, sender_id, "Gift deleted");
        Ok(())
    }

    /* ----------------------------------------------------------------------
    Submissions
    ---------------------------------------------------------------------- */

    /// Apply one submission to a specific gift.
    pub async fn submit(
        &self,
        target: GiftWithChallenge,
        content: &SubmissionContent,
        origin: SubmissionOrigin,
    ) -> LifecycleResult<SubmissionOutcome> {
        if !target.gift.is_active() {
            return Ok(SubmissionOutcome::Inactive);
        }

        let challenge = &target.challenge;
        if !validate(challenge.challenge_type, &challenge.requirements, content) {
            tracing::debug!(
                gift_id = target.gift.id,
                challenge_id = challenge.id,
                channel = origin.channel(),
                "Submission did not satisfy challenge"
            );
            return Ok(SubmissionOutcome::Invalid);
        }

        if challenge.challenge_type.requires_approval() {
            return self.submit_for_approval(target, content, &origin).await;
        }

        let record = submission_record(content, &origin);
        self.apply_step(target, record, &origin).await
    }

    /// Record one externally confirmed step of a `custom` or `multi-day`
    /// challenge on behalf of its sender.
    pub async fn confirm_step(
        &self,
        challenge_id: DbId,
        sender_id: DbId,
        note: Option<String>,
    ) -> LifecycleResult<SubmissionOutcome> {
        let challenge = self
            .ctx
            .store
            .get_challenge(challenge_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Challenge",
                id: challenge_id,
            })?;
        let target = self.ctx.load_owned(challenge.gift_id, sender_id).await?;

        if !challenge.challenge_type.accepts_external_confirmation() {
            return Err(CoreError::Validation(format!(
                "'{}' challenges are completed by the recipient, not by confirmation",
                challenge.challenge_type
            ))
            .into());
        }
        if !target.gift.is_active() {
            return Err(CoreError::Conflict(format!(
                "Gift {} is '{}' and no longer accepts progress",
                target.gift.id, target.gift.status
            ))
            .into());
        }

        let origin = SubmissionOrigin::SenderConfirmation { user_id: sender_id };
        let record = SubmissionRecord::new(
            SubmissionKind::Confirmation,
            non_blank(note).unwrap_or_default(),
        )
        .with_metadata(serde_json::json!({ "channel": origin.channel() }));
        self.apply_step(target, record, &origin).await
    }

    async fn submit_for_approval(
        &self,
        target: GiftWithChallenge,
        content: &SubmissionContent,
        origin: &SubmissionOrigin,
    ) -> LifecycleResult<SubmissionOutcome> {
        let GiftWithChallenge { gift, challenge } = target;
        let Some(media_url) = content.media_url.clone().filter(|u| !u.trim().is_empty()) else {
            return Ok(SubmissionOutcome::Invalid);
        };

        let submitter_contact = match origin {
            SubmissionOrigin::Sms { from } => from.clone(),
            _ => gift
                .recipient_phone
                .clone()
                .or_else(|| gift.recipient_email.clone())
                .unwrap_or_else(|| origin.channel().to_string()),
        };

        let input = NewPhotoSubmission {
            challenge_id: challenge.id,
            gift_id: gift.id,
            media_url,
            media_content_type: content.media_content_type.clone(),
            submitter_contact,
        };
        let submission = match self.ctx.store.create_photo_submission(&input).await {
            Ok(submission) => submission,
            Err(StoreError::Conflict(_)) => {
                tracing::info!(gift_id = gift.id, "Submission ignored, previous one awaits review");
                return Ok(SubmissionOutcome::AlreadyAwaitingReview);
            }
            Err(e) => return Err(e.into()),
        };

        let gift = match self
            .ctx
            .store
            .set_gift_status(gift.id, &SUBMITTABLE_FOR_APPROVAL, GiftStatus::PendingApproval)
            .await
        {
            Ok(gift) => gift,
            Err(StoreError::Conflict(msg)) => {
                tracing::warn!(
                    gift_id = gift.id,
                    submission_id = submission.id,
                    reason = %msg,
                    "Gift closed while submission was being recorded"
                );
                if let Err(e) = self
                    .ctx
                    .store
                    .update_photo_submission_status(
                        submission.id,
                        SubmissionStatus::Rejected,
                        Some(GIFT_CLOSED_REASON),
                    )
                    .await
                {
                    tracing::error!(
                        submission_id = submission.id,
                        error = %e,
                        "Failed to close orphaned submission"
                    );
                }
                return Ok(SubmissionOutcome::Inactive);
            }
            Err(e) => return Err(e.into()),
        };

        self.approvals
            .request_review(&gift, &challenge, &submission)
            .await;

        Ok(SubmissionOutcome::AwaitingApproval {
            gift,
            challenge,
            submission,
        })
    }

    /// Count one step with optimistic retry, then notify.
    async fn apply_step(
        &self,
        target: GiftWithChallenge,
        record: SubmissionRecord,
        origin: &SubmissionOrigin,
    ) -> LifecycleResult<SubmissionOutcome> {
        let gift_id = target.gift.id;
        let mut current = target;

        for attempt in 1..=MAX_PROGRESS_ATTEMPTS {
            if !current.gift.is_active() {
                return Ok(SubmissionOutcome::Inactive);
            }

            let mut progress = current.challenge.progress.clone();
            let step = progress.record_step(record.clone());
            let (gift_status, unlock) = match step {
                StepOutcome::AlreadyComplete => return Ok(SubmissionOutcome::Inactive),
                StepOutcome::Advanced { .. } => (GiftStatus::InProgress, false),
                StepOutcome::Completed { .. } => (GiftStatus::Completed, true),
            };

            let update = ProgressUpdate {
                challenge_id: current.challenge.id,
                expected_version: current.challenge.version,
                progress,
                gift_status,
                unlock,
            };

            match self.ctx.store.save_challenge_progress(&update).await {
                Ok(saved) => return Ok(self.after_step(saved, step, origin).await),
                Err(StoreError::StaleVersion { .. }) => {
                    tracing::debug!(
                        gift_id,
                        challenge_id = update.challenge_id,
                        attempt,
                        "Progress write lost a race, re-reading"
                    );
                    current = GiftWithChallenge {
                        gift: self.ctx.load_gift(gift_id).await?,
                        challenge: self.ctx.load_challenge_for_gift(gift_id).await?,
                    };
                }
                // The gift left the active set between read and write.
                Err(StoreError::Conflict(_)) => return Ok(SubmissionOutcome::Inactive),
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(gift_id, "Progress write kept losing races, giving up");
        Err(LifecycleError::Core(CoreError::Conflict(format!(
            "Gift {gift_id} is being updated concurrently, please retry"
        ))))
    }

    async fn after_step(
        &self,
        saved: GiftWithChallenge,
        step: StepOutcome,
        origin: &SubmissionOrigin,
    ) -> SubmissionOutcome {
        let gift = &saved.gift;
        let progress = &saved.challenge.progress;
        let actor = origin.actor();

        let with_actor = |event: LifecycleEvent| match actor {
            Some(user_id) => event.with_actor(user_id),
            None => event,
        };

        let kind = match step {
            StepOutcome::Completed { .. } => {
                tracing::info!(
                    gift_id = gift.id,
                    challenge_id = saved.challenge.id,
                    channel = origin.channel(),
                    "Challenge completed, gift unlocked"
                );
                self.ctx.publish(with_actor(
                    LifecycleEvent::new(event_types::CHALLENGE_COMPLETED, gift.id).with_payload(
                        serde_json::json!({
                            "total_steps": progress.total_steps,
                            "channel": origin.channel(),
                        }),
                    ),
                ));
                self.ctx
                    .publish(LifecycleEvent::new(event_types::GIFT_UNLOCKED, gift.id));
                TemplateKind::ChallengeCompleted
            }
            _ => {
                tracing::info!(
                    gift_id = gift.id,
                    challenge_id = saved.challenge.id,
                    current_step = progress.current_step,
                    total_steps = progress.total_steps,
                    channel = origin.channel(),
                    "Challenge step recorded"
                );
                self.ctx.publish(with_actor(
                    LifecycleEvent::new(event_types::CHALLENGE_PROGRESS, gift.id).with_payload(
                        serde_json::json!({
                            "current_step": progress.current_step,
                            "total_steps": progress.total_steps,
                            "channel": origin.channel(),
                        }),
                    ),
                ));
                TemplateKind::ChallengeProgress
            }
        };

        let data = self.ctx.template_data(gift, &saved.challenge);
        self.ctx
            .gateway
            .dispatch(gift, origin.notification_audience(), kind, &data)
            .await;

        match step {
            StepOutcome::Completed { .. } => SubmissionOutcome::Completed(saved),
            _ => SubmissionOutcome::Advanced(saved),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn submission_record(content: &SubmissionContent, origin: &SubmissionOrigin) -> SubmissionRecord {
    let metadata = serde_json::json!({
        "channel": origin.channel(),
        "media_count": content.media_count,
    });
    let record = match content.media_url.as_deref() {
        Some(url) if content.has_media() => SubmissionRecord::new(SubmissionKind::Media, url),
        _ => SubmissionRecord::new(SubmissionKind::Text, content.text.trim()),
    };
    record.with_metadata(metadata)
}

fn required_text(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Sender contact fields are optional, but must be well-formed when given.
fn optional_contact(
    sender: &SenderIdentity,
) -> Result<(Option<String>, Option<String>), CoreError> {
    let phone = match non_blank(sender.phone.clone()) {
        Some(raw) => Some(normalize_phone(&raw).ok_or_else(|| {
            CoreError::Validation(format!("Invalid sender phone number '{raw}'"))
        })?),
        None => None,
    };
    let email = match non_blank(sender.email.clone()) {
        Some(raw) if is_plausible_email(&raw) => Some(raw.to_lowercase()),
        Some(raw) => {
            return Err(CoreError::Validation(format!(
                "Invalid sender email address '{raw}'"
            )))
        }
        None => None,
    };
    Ok((phone, email))
}
