//! Expiry sweep: moves overdue non-terminal gifts to `expired`.

use giftlock_core::gift::GiftStatus;
use giftlock_core::types::Timestamp;
use giftlock_db::StoreError;
use giftlock_events::{event_types, LifecycleEvent};

use crate::error::LifecycleResult;
use crate::state_machine::GiftLifecycle;

/// Gifts expired per sweep batch.
pub const EXPIRY_BATCH_SIZE: i64 = 100;

impl GiftLifecycle {
    /// Expire every active gift whose deadline is at or before `now`.
    /// Returns how many gifts were expired.
    pub async fn expire_overdue(&self, now: Timestamp) -> LifecycleResult<usize> {
        let mut expired = 0;
        loop {
            let batch = self
                .ctx
                .store
                .find_expired_gifts(now, EXPIRY_BATCH_SIZE)
                .await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            let mut progressed = false;

            for gift in batch {
                match self
                    .ctx
                    .store
                    .set_gift_status(gift.id, &GiftStatus::ACTIVE, GiftStatus::Expired)
                    .await
                {
                    Ok(_) => {
                        expired += 1;
                        progressed = true;
                        tracing::info!(gift_id = gift.id, from = %gift.status, "Gift expired");
                        self.ctx.publish(
                            LifecycleEvent::new(event_types::GIFT_EXPIRED, gift.id).with_payload(
                                serde_json::json!({
                                    "from": gift.status,
                                    "expires_at": gift.expires_at,
                                }),
                            ),
                        );
                    }
                    // Completed or cancelled since it was listed.
                    Err(StoreError::Conflict(_)) => progressed = true,
                    Err(e) => return Err(e.into()),
                }
            }

            if !progressed || (batch_len as i64) < EXPIRY_BATCH_SIZE {
                break;
            }
        }
        Ok(expired)
    }
}
