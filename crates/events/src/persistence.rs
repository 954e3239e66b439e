//! Durable event persistence service.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and appends every [`LifecycleEvent`] to its gift's event log through the
//! [`GiftStore`]. It runs as a long-lived background task and exits when the
//! bus is dropped.

use std::sync::Arc;

use giftlock_db::{GiftStore, StoreError};
use tokio::sync::broadcast;

use crate::bus::LifecycleEvent;

/// Background service that persists lifecycle events.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(
        store: Arc<dyn GiftStore>,
        mut receiver: broadcast::Receiver<LifecycleEvent>,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::persist(store.as_ref(), &event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    async fn persist(store: &dyn GiftStore, event: &LifecycleEvent) {
        match store
            .append_event(event.gift_id, &event.event_type, &event.log_payload())
            .await
        {
            Ok(_) => {}
            // The gift was deleted between the event and its persistence.
            Err(StoreError::NotFound { .. }) => {
                tracing::debug!(
                    gift_id = event.gift_id,
                    event_type = %event.event_type,
                    "Dropping event for deleted gift"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    gift_id = event.gift_id,
                    event_type = %event.event_type,
                    "Failed to persist event"
                );
            }
        }
    }
}
