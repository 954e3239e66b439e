//! Photo/video submission model (human approval sub-flow).

use giftlock_core::approval::SubmissionStatus;
use giftlock_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::gift::Gift;

/// A row from the `photo_submissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PhotoSubmission {
    pub id: DbId,
    pub challenge_id: DbId,
    pub gift_id: DbId,
    pub media_url: String,
    pub media_content_type: Option<String>,
    pub submitter_contact: String,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    pub rejection_reason: Option<String>,
    pub submitted_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
}

/// DTO for recording a new submission awaiting review.
#[derive(Debug, Clone)]
pub struct NewPhotoSubmission {
    pub challenge_id: DbId,
    pub gift_id: DbId,
    pub media_url: String,
    pub media_content_type: Option<String>,
    pub submitter_contact: String,
}

/// A review decision as committed: the resolved submission and its gift.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSubmission {
    pub submission: PhotoSubmission,
    pub gift: Gift,
}
