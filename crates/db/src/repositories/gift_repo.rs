//! Repository for the `gifts` table.

use giftlock_core::gift::GiftStatus;
use giftlock_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::gift::{Gift, NewGift};

/// Column list for gifts queries.
const COLUMNS: &str = "id, tracking_id, sender_id, sender_name, sender_phone, sender_email, \
    recipient_name, recipient_phone, recipient_email, gift_type, gift_value, gift_description, \
    personal_note, delivery_method, status, unlocked, unlock_evidence_url, unlocked_at, \
    expires_at, created_at, updated_at";

/// Statuses excluded from "active" queries.
const TERMINAL_STATUSES: &str = "('completed', 'expired', 'cancelled')";

/// Provides CRUD operations for gifts.
pub struct GiftRepo;

impl GiftRepo {
    /// Insert a new gift in `pending` status, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewGift,
        tracking_id: Uuid,
    ) -> Result<Gift, sqlx::Error> {
        let query = format!(
            "INSERT INTO gifts
                (tracking_id, sender_id, sender_name, sender_phone, sender_email,
                 recipient_name, recipient_phone, recipient_email, gift_type, gift_value,
                 gift_description, personal_note, delivery_method, status, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Gift>(&query)
            .bind(tracking_id)
            .bind(input.sender_id)
            .bind(&input.sender_name)
            .bind(&input.sender_phone)
            .bind(&input.sender_email)
            .bind(&input.recipient_name)
            .bind(&input.recipient_phone)
            .bind(&input.recipient_email)
            .bind(&input.gift_type)
            .bind(&input.gift_value)
            .bind(&input.gift_description)
            .bind(&input.personal_note)
            .bind(input.delivery_method.as_str())
            .bind(GiftStatus::Pending.as_str())
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Find a gift by its internal ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Gift>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM gifts WHERE id = $1");
        sqlx::query_as::<_, Gift>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a gift by ID and hold a row lock until the transaction ends.
    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Gift>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM gifts WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Gift>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a gift by its public tracking ID.
    pub async fn find_by_tracking_id<'e, E: PgExecutor<'e>>(
        executor: E,
        tracking_id: Uuid,
    ) -> Result<Option<Gift>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM gifts WHERE tracking_id = $1");
        sqlx::query_as::<_, Gift>(&query)
            .bind(tracking_id)
            .fetch_optional(executor)
            .await
    }

    /// List a sender's gifts, newest first.
    pub async fn list_for_sender<'e, E: PgExecutor<'e>>(
        executor: E,
        sender_id: DbId,
    ) -> Result<Vec<Gift>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gifts
             WHERE sender_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Gift>(&query)
            .bind(sender_id)
            .fetch_all(executor)
            .await
    }

    /// List non-terminal gifts addressed to a recipient phone, newest first.
    pub async fn list_active_for_recipient_phone<'e, E: PgExecutor<'e>>(
        executor: E,
        phone: &str,
    ) -> Result<Vec<Gift>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gifts
             WHERE recipient_phone = $1
               AND status NOT IN {TERMINAL_STATUSES}
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Gift>(&query)
            .bind(phone)
            .fetch_all(executor)
            .await
    }

    /// List non-terminal gifts whose expiry is at or before `now`, oldest
    /// expiry first.
    pub async fn list_expired<'e, E: PgExecutor<'e>>(
        executor: E,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<Gift>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM gifts
             WHERE expires_at <= $1
               AND status NOT IN {TERMINAL_STATUSES}
             ORDER BY expires_at ASC
             LIMIT $2"
        );
        sqlx::query_as::<_, Gift>(&query)
            .bind(now)
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    /// Set a gift's status.
    pub async fn update_status<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        status: GiftStatus,
    ) -> Result<Gift, sqlx::Error> {
        let query = format!(
            "UPDATE gifts SET status = $2, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Gift>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(executor)
            .await
    }

    /// Mark a gift completed and unlocked in a single write.
    pub async fn mark_unlocked<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        evidence_url: Option<&str>,
    ) -> Result<Gift, sqlx::Error> {
        let query = format!(
            "UPDATE gifts
             SET status = $2,
                 unlocked = true,
                 unlock_evidence_url = COALESCE($3, unlock_evidence_url),
                 unlocked_at = now(),
                 updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Gift>(&query)
            .bind(id)
            .bind(GiftStatus::Completed.as_str())
            .bind(evidence_url)
            .fetch_one(executor)
            .await
    }

    /// Delete a gift. Challenge, submissions, and events cascade.
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM gifts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
