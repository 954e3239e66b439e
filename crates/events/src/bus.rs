//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`LifecycleEvent`]s. It is
//! shared via `Arc<EventBus>` between the lifecycle engine, the notification
//! gateway, and the persistence subscriber.

use chrono::{DateTime, Utc};
use giftlock_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event type names written to the gift event log.
pub mod event_types {
    pub const GIFT_CREATED: &str = "gift.created";
    pub const GIFT_NOTIFIED: &str = "gift.notified";
    pub const GIFT_RESENT: &str = "gift.resent";
    pub const GIFT_CANCELLED: &str = "gift.cancelled";
    pub const GIFT_EXPIRED: &str = "gift.expired";
    pub const GIFT_UNLOCKED: &str = "gift.unlocked";
    pub const CHALLENGE_PROGRESS: &str = "challenge.progress";
    pub const CHALLENGE_COMPLETED: &str = "challenge.completed";
    pub const CHALLENGE_KEYWORD_MISSING: &str = "challenge.keyword_missing";
    pub const SUBMISSION_RECEIVED: &str = "submission.received";
    pub const SUBMISSION_APPROVED: &str = "submission.approved";
    pub const SUBMISSION_REJECTED: &str = "submission.rejected";
    pub const NOTIFICATION_FAILED: &str = "notification.failed";
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Something that happened to a gift.
///
/// Constructed via [`LifecycleEvent::new`] and enriched with
/// [`with_actor`](LifecycleEvent::with_actor) and
/// [`with_payload`](LifecycleEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Dot-separated event name, one of [`event_types`].
    pub event_type: String,

    pub gift_id: DbId,

    /// The authenticated user that triggered the event, if any. Inbound SMS
    /// and expiry events have no actor.
    pub actor_user_id: Option<DbId>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(event_type: impl Into<String>, gift_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            gift_id,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// The payload written to the event log, with the actor folded in.
    pub fn log_payload(&self) -> serde_json::Value {
        let mut payload = self.payload.clone();
        if let (Some(actor), serde_json::Value::Object(map)) = (self.actor_user_id, &mut payload) {
            map.insert("actor_user_id".to_string(), actor.into());
        }
        payload
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use giftlock_events::bus::{event_types, EventBus, LifecycleEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(LifecycleEvent::new(event_types::GIFT_CREATED, 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is subscribed.
    pub fn publish(&self, event: LifecycleEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
