//! Shared collaborators and helpers for the lifecycle components.

use std::sync::Arc;

use chrono::Duration;
use giftlock_core::error::CoreError;
use giftlock_core::templates::TemplateData;
use giftlock_core::types::DbId;
use giftlock_db::models::challenge::Challenge;
use giftlock_db::models::gift::{Gift, GiftWithChallenge};
use giftlock_db::GiftStore;
use giftlock_events::{EventBus, LifecycleEvent, NotificationGateway};

use crate::error::LifecycleResult;

/// Default time a recipient has to complete a challenge.
pub const DEFAULT_GIFT_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Base URL of the recipient app; tracking links are `{base}/track/{id}`.
    pub public_base_url: String,
    pub default_gift_lifetime: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:3000".to_string(),
            default_gift_lifetime: Duration::days(DEFAULT_GIFT_LIFETIME_DAYS),
        }
    }
}

/// Everything the lifecycle components talk to.
#[derive(Clone)]
pub struct LifecycleContext {
    pub store: Arc<dyn GiftStore>,
    pub gateway: Arc<NotificationGateway>,
    pub bus: Arc<EventBus>,
    pub settings: LifecycleSettings,
}

impl LifecycleContext {
    pub fn new(
        store: Arc<dyn GiftStore>,
        gateway: Arc<NotificationGateway>,
        bus: Arc<EventBus>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            bus,
            settings,
        }
    }

    pub fn tracking_url(&self, gift: &Gift) -> String {
        format!(
            "{}/track/{}",
            self.settings.public_base_url.trim_end_matches('/'),
            gift.tracking_id
        )
    }

    /// Template values for `gift`. The gift's value is only included once it
    /// is unlocked.
    pub fn template_data(&self, gift: &Gift, challenge: &Challenge) -> TemplateData {
        TemplateData {
            sender_name: gift.sender_name.clone(),
            recipient_name: gift.recipient_name.clone(),
            gift_type: gift.gift_type.clone(),
            gift_value: gift.gift_value.clone().filter(|_| gift.unlocked),
            gift_description: gift.gift_description.clone(),
            personal_note: gift.personal_note.clone(),
            challenge_description: challenge.description.clone(),
            current_step: Some(challenge.progress.current_step),
            total_steps: Some(challenge.progress.total_steps),
            reason: None,
            tracking_url: Some(self.tracking_url(gift)),
            media_url: None,
        }
    }

    pub fn publish(&self, event: LifecycleEvent) {
        self.bus.publish(event);
    }

    pub async fn load_gift(&self, gift_id: DbId) -> LifecycleResult<Gift> {
        Ok(self
            .store
            .get_gift(gift_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Gift",
                id: gift_id,
            })?)
    }

    /// Load a gift and its challenge, requiring `sender_id` to own it.
    pub async fn load_owned(
        &self,
        gift_id: DbId,
        sender_id: DbId,
    ) -> LifecycleResult<GiftWithChallenge> {
        let gift = self.load_gift(gift_id).await?;
        ensure_owner(&gift, sender_id)?;
        let challenge = self.load_challenge_for_gift(gift_id).await?;
        Ok(GiftWithChallenge { gift, challenge })
    }

    pub async fn load_challenge_for_gift(&self, gift_id: DbId) -> LifecycleResult<Challenge> {
        Ok(self
            .store
            .get_challenge_for_gift(gift_id)
            .await?
            .ok_or_else(|| {
                CoreError::Internal(format!("Gift {gift_id} has no challenge"))
            })?)
    }
}

/// Fail with `Forbidden` unless `sender_id` created `gift`.
pub fn ensure_owner(gift: &Gift, sender_id: DbId) -> Result<(), CoreError> {
    if gift.sender_id != sender_id {
        return Err(CoreError::Forbidden(format!(
            "Gift {} belongs to another sender",
            gift.id
        )));
    }
    Ok(())
}
