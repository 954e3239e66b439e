//! Outbound message templates and inbound reply texts.
//!
//! [`render`] turns a [`TemplateKind`] plus [`TemplateData`] into the SMS body
//! and email subject/body for that notification. The `reply_*` functions
//! produce the single synchronous reply sent back on the inbound SMS channel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which notification is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Initial "you have a gift" message to the recipient.
    GiftReceived,
    /// A non-final step of a multi-step challenge was counted.
    ChallengeProgress,
    /// The final step was counted and the gift is unlocked.
    ChallengeCompleted,
    /// A photo/video awaits the sender's review.
    ApprovalRequested,
    /// The sender approved the recipient's submission.
    SubmissionApproved,
    /// The sender rejected the recipient's submission.
    SubmissionRejected,
}

impl TemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::GiftReceived => "gift_received",
            TemplateKind::ChallengeProgress => "challenge_progress",
            TemplateKind::ChallengeCompleted => "challenge_completed",
            TemplateKind::ApprovalRequested => "approval_requested",
            TemplateKind::SubmissionApproved => "submission_approved",
            TemplateKind::SubmissionRejected => "submission_rejected",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values interpolated into templates. Absent fields are simply omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateData {
    pub sender_name: String,
    pub recipient_name: Option<String>,
    pub gift_type: String,
    /// Only populated once the gift is unlocked.
    pub gift_value: Option<String>,
    pub gift_description: Option<String>,
    pub personal_note: Option<String>,
    pub challenge_description: String,
    pub current_step: Option<i32>,
    pub total_steps: Option<i32>,
    pub reason: Option<String>,
    pub tracking_url: Option<String>,
    pub media_url: Option<String>,
}

impl TemplateData {
    fn gift_label(&self) -> String {
        match self.gift_value.as_deref().filter(|v| !v.is_empty()) {
            Some(value) => format!("{} ({value})", self.gift_type),
            None => self.gift_type.clone(),
        }
    }

    fn recipient_label(&self) -> &str {
        self.recipient_name.as_deref().unwrap_or("Your recipient")
    }

    fn tracking_suffix(&self) -> String {
        self.tracking_url
            .as_deref()
            .map(|url| format!(" {url}"))
            .unwrap_or_default()
    }
}

/// A rendered notification for both channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub sms_body: String,
    pub email_subject: String,
    pub email_body: String,
}

/// Render the SMS and email text for a notification.
pub fn render(kind: TemplateKind, data: &TemplateData) -> RenderedMessage {
    let sender = data.sender_name.as_str();

    let (sms_body, email_subject) = match kind {
        TemplateKind::GiftReceived => (
            format!(
                "{sender} sent you a gift! To unlock it: {}. Reply to this message to get started.{}",
                data.challenge_description,
                data.tracking_suffix()
            ),
            format!("{sender} sent you a gift"),
        ),
        TemplateKind::ChallengeProgress => (
            format!(
                "Nice work! Step {} of {} done on your challenge from {sender}. Keep going!",
                data.current_step.unwrap_or(0),
                data.total_steps.unwrap_or(0)
            ),
            "You're making progress on your gift challenge".to_string(),
        ),
        TemplateKind::ChallengeCompleted => (
            format!(
                "Challenge complete! Your gift from {sender} is unlocked: {}.",
                data.gift_label()
            ),
            format!("Your gift from {sender} is unlocked"),
        ),
        TemplateKind::ApprovalRequested => (
            format!(
                "{} sent a submission for your gift challenge \"{}\". Review it:{}",
                data.recipient_label(),
                data.challenge_description,
                data.media_url
                    .as_deref()
                    .map(|url| format!(" {url}"))
                    .unwrap_or_else(|| data.tracking_suffix())
            ),
            "A gift submission is waiting for your review".to_string(),
        ),
        TemplateKind::SubmissionApproved => (
            format!(
                "{sender} approved your submission! Your gift is unlocked: {}.",
                data.gift_label()
            ),
            format!("{sender} approved your submission"),
        ),
        TemplateKind::SubmissionRejected => (
            match data.reason.as_deref() {
                Some(reason) => format!(
                    "{sender} didn't approve your submission: {reason}. Send another to try again."
                ),
                None => format!(
                    "{sender} didn't approve your submission. Send another to try again."
                ),
            },
            "Your gift submission needs another try".to_string(),
        ),
    };

    let mut email_body = sms_body.clone();
    if let Some(note) = data.personal_note.as_deref().filter(|n| !n.is_empty()) {
        if kind == TemplateKind::GiftReceived {
            email_body.push_str(&format!("\n\nA note from {sender}:\n{note}"));
        }
    }
    if let Some(description) = data.gift_description.as_deref().filter(|d| !d.is_empty()) {
        if matches!(
            kind,
            TemplateKind::ChallengeCompleted | TemplateKind::SubmissionApproved
        ) {
            email_body.push_str(&format!("\n\n{description}"));
        }
    }

    RenderedMessage {
        sms_body,
        email_subject,
        email_body,
    }
}

/* --------------------------------------------------------------------------
Inbound replies
-------------------------------------------------------------------------- */

/// Reply when the sender of an inbound message has no active gift.
pub const REPLY_NO_ACTIVE_CHALLENGE: &str =
    "You don't have any active gift challenges right now. Check back when someone sends you a gift!";

/// Reply when no active challenge accepts the message.
pub const REPLY_TRY_AGAIN: &str =
    "That doesn't complete your challenge yet. Check the challenge details and reply to try again.";

/// Reply when a media submission arrives while a previous one awaits review.
pub const REPLY_AWAITING_REVIEW: &str =
    "Your last submission is still waiting for review. You'll hear back soon!";

/// Reply when the message could not be processed at all.
pub const REPLY_TEMPORARY_FAILURE: &str =
    "Sorry, something went wrong on our end. Please try again in a few minutes.";

/// Reply after a photo/video is accepted for review.
pub fn reply_submission_received(sender_name: &str) -> String {
    format!("Got it! {sender_name} will review your submission and you'll hear back soon.")
}
