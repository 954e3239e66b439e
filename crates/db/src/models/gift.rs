//! Gift entity model and DTOs.

use giftlock_core::gift::{DeliveryMethod, GiftStatus};
use giftlock_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::challenge::Challenge;

/// A row from the `gifts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Gift {
    pub id: DbId,
    pub tracking_id: Uuid,
    pub sender_id: DbId,
    pub sender_name: String,
    pub sender_phone: Option<String>,
    pub sender_email: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_email: Option<String>,
    pub gift_type: String,
    pub gift_value: Option<String>,
    pub gift_description: Option<String>,
    pub personal_note: Option<String>,
    #[sqlx(try_from = "String")]
    pub delivery_method: DeliveryMethod,
    #[sqlx(try_from = "String")]
    pub status: GiftStatus,
    pub unlocked: bool,
    pub unlock_evidence_url: Option<String>,
    pub unlocked_at: Option<Timestamp>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Gift {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.is_active() && self.expires_at <= now
    }
}

/// DTO for creating a new gift. Contact fields must already be normalized.
#[derive(Debug, Clone)]
pub struct NewGift {
    pub sender_id: DbId,
    pub sender_name: String,
    pub sender_phone: Option<String>,
    pub sender_email: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_email: Option<String>,
    pub gift_type: String,
    pub gift_value: Option<String>,
    pub gift_description: Option<String>,
    pub personal_note: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub expires_at: Timestamp,
}

/// A gift together with its (1:1) challenge.
#[derive(Debug, Clone, Serialize)]
pub struct GiftWithChallenge {
    pub gift: Gift,
    pub challenge: Challenge,
}
