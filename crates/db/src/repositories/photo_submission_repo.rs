//! Repository for the `photo_submissions` table.

use giftlock_core::approval::SubmissionStatus;
use giftlock_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::photo_submission::{NewPhotoSubmission, PhotoSubmission};

/// Column list for photo_submissions queries.
const COLUMNS: &str = "id, challenge_id, gift_id, media_url, media_content_type, \
    submitter_contact, status, rejection_reason, submitted_at, reviewed_at";

/// Name of the partial unique index allowing one pending submission per gift.
pub const PENDING_UNIQUE_CONSTRAINT: &str = "uq_photo_submissions_pending";

/// Provides CRUD operations for photo submissions.
pub struct PhotoSubmissionRepo;

impl PhotoSubmissionRepo {
    /// Insert a submission in `pending_approval` status.
    ///
    /// Fails with a unique violation on [`PENDING_UNIQUE_CONSTRAINT`] if the
    /// gift already has a pending submission.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewPhotoSubmission,
    ) -> Result<PhotoSubmission, sqlx::Error> {
        let query = format!(
            "INSERT INTO photo_submissions
                (challenge_id, gift_id, media_url, media_content_type, submitter_contact, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhotoSubmission>(&query)
            .bind(input.challenge_id)
            .bind(input.gift_id)
            .bind(&input.media_url)
            .bind(&input.media_content_type)
            .bind(&input.submitter_contact)
            .bind(SubmissionStatus::PendingApproval.as_str())
            .fetch_one(executor)
            .await
    }

    /// Find a submission by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<PhotoSubmission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM photo_submissions WHERE id = $1");
        sqlx::query_as::<_, PhotoSubmission>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a submission by ID and hold a row lock until the transaction ends.
    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<PhotoSubmission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM photo_submissions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, PhotoSubmission>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List a gift's submissions, newest first.
    pub async fn list_for_gift<'e, E: PgExecutor<'e>>(
        executor: E,
        gift_id: DbId,
    ) -> Result<Vec<PhotoSubmission>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM photo_submissions
             WHERE gift_id = $1
             ORDER BY submitted_at DESC, id DESC"
        );
        sqlx::query_as::<_, PhotoSubmission>(&query)
            .bind(gift_id)
            .fetch_all(executor)
            .await
    }

    /// List pending submissions on gifts owned by `sender_id`, oldest first.
    pub async fn list_pending_for_sender<'e, E: PgExecutor<'e>>(
        executor: E,
        sender_id: DbId,
    ) -> Result<Vec<PhotoSubmission>, sqlx::Error> {
        sqlx::query_as::<_, PhotoSubmission>(
            "SELECT ps.id, ps.challenge_id, ps.gift_id, ps.media_url, ps.media_content_type,
                    ps.submitter_contact, ps.status, ps.rejection_reason, ps.submitted_at,
                    ps.reviewed_at
             FROM photo_submissions ps
             JOIN gifts g ON g.id = ps.gift_id
             WHERE g.sender_id = $1
               AND ps.status = 'pending_approval'
             ORDER BY ps.submitted_at ASC, ps.id ASC",
        )
        .bind(sender_id)
        .fetch_all(executor)
        .await
    }

    /// Record a review decision.
    pub async fn update_status<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        status: SubmissionStatus,
        rejection_reason: Option<&str>,
    ) -> Result<PhotoSubmission, sqlx::Error> {
        let query = format!(
            "UPDATE photo_submissions
             SET status = $2, rejection_reason = $3, reviewed_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhotoSubmission>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(rejection_reason)
            .fetch_one(executor)
            .await
    }
}
