//! Repository for the `gift_events` table.

use giftlock_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::gift_event::GiftEvent;

/// Column list for gift_events queries.
const COLUMNS: &str = "id, gift_id, event_type, payload, created_at";

/// Provides append/read operations for the gift event log.
pub struct GiftEventRepo;

impl GiftEventRepo {
    /// Append an event, returning the stored row.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        gift_id: DbId,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<GiftEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO gift_events (gift_id, event_type, payload)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GiftEvent>(&query)
            .bind(gift_id)
            .bind(event_type)
            .bind(payload)
            .fetch_one(executor)
            .await
    }

    /// List a gift's events in the order they were recorded.
    pub async fn list_for_gift<'e, E: PgExecutor<'e>>(
        executor: E,
        gift_id: DbId,
    ) -> Result<Vec<GiftEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM gift_events WHERE gift_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, GiftEvent>(&query)
            .bind(gift_id)
            .fetch_all(executor)
            .await
    }
}
