//! Gift event log model.

use giftlock_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `gift_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GiftEvent {
    pub id: DbId,
    pub gift_id: DbId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
