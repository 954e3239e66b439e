//! Inbound Response Router.
//!
//! An inbound SMS is matched by sender phone number against that number's
//! active gifts, newest first. The first challenge whose validator accepts
//! the message receives it, and no other: one message resolves at most one
//! challenge step. The router always produces exactly one reply text.

use giftlock_core::contact::normalize_phone;
use giftlock_core::templates::{
    render, reply_submission_received, TemplateKind, REPLY_AWAITING_REVIEW,
    REPLY_NO_ACTIVE_CHALLENGE, REPLY_TRY_AGAIN,
};
use giftlock_core::types::DbId;
use giftlock_core::validator::{validate, SubmissionContent};
use serde::{Deserialize, Serialize};

use crate::error::LifecycleResult;
use crate::state_machine::{GiftLifecycle, SubmissionOrigin, SubmissionOutcome};

/// One message delivered by the inbound SMS channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub body: String,
    pub media_count: u32,
    pub media_url: Option<String>,
    pub media_content_type: Option<String>,
}

impl InboundMessage {
    fn content(&self) -> SubmissionContent {
        SubmissionContent {
            text: self.body.clone(),
            media_count: self.media_count,
            media_url: self.media_url.clone(),
            media_content_type: self.media_content_type.clone(),
        }
    }
}

/// The synchronous reply and which gift, if any, the message was applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReply {
    pub text: String,
    pub gift_id: Option<DbId>,
}

impl InboundReply {
    fn unmatched(text: &str) -> Self {
        Self {
            text: text.to_string(),
            gift_id: None,
        }
    }
}

#[derive(Clone)]
pub struct InboundRouter {
    lifecycle: GiftLifecycle,
}

impl InboundRouter {
    pub fn new(lifecycle: GiftLifecycle) -> Self {
        Self { lifecycle }
    }

    pub async fn handle(&self, message: &InboundMessage) -> LifecycleResult<InboundReply> {
        let Some(from) = normalize_phone(&message.from) else {
            tracing::info!(from = %message.from, "Inbound message from unrecognized number");
            return Ok(InboundReply::unmatched(REPLY_NO_ACTIVE_CHALLENGE));
        };

        let candidates = self
            .lifecycle
            .ctx
            .store
            .find_active_gifts_by_recipient_contact(&from)
            .await?;
        if candidates.is_empty() {
            tracing::debug!(from = %from, "No active gifts for inbound number");
            return Ok(InboundReply::unmatched(REPLY_NO_ACTIVE_CHALLENGE));
        }

        let content = message.content();
        for candidate in candidates {
            let challenge = &candidate.challenge;
            if !validate(challenge.challenge_type, &challenge.requirements, &content) {
                continue;
            }

            let gift_id = candidate.gift.id;
            let sender_name = candidate.gift.sender_name.clone();
            let origin = SubmissionOrigin::Sms { from: from.clone() };
            let outcome = self.lifecycle.submit(candidate, &content, origin).await?;

            let text = match outcome {
                SubmissionOutcome::Advanced(saved) => {
                    let data = self.lifecycle.ctx.template_data(&saved.gift, &saved.challenge);
                    render(TemplateKind::ChallengeProgress, &data).sms_body
                }
                SubmissionOutcome::Completed(saved) => {
                    let data = self.lifecycle.ctx.template_data(&saved.gift, &saved.challenge);
                    render(TemplateKind::ChallengeCompleted, &data).sms_body
                }
                SubmissionOutcome::AwaitingApproval { .. } => {
                    reply_submission_received(&sender_name)
                }
                SubmissionOutcome::AlreadyAwaitingReview => REPLY_AWAITING_REVIEW.to_string(),
                // Lost a race with completion, cancellation, or expiry.
                SubmissionOutcome::Invalid | SubmissionOutcome::Inactive => continue,
            };

            tracing::info!(gift_id, from = %from, "Inbound message applied");
            return Ok(InboundReply {
                text,
                gift_id: Some(gift_id),
            });
        }

        Ok(InboundReply::unmatched(REPLY_TRY_AGAIN))
    }
}
