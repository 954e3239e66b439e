//! Shared harness: in-memory store, recording providers, and a lifecycle
//! wired to them.

#![allow(dead_code)]

use std::sync::Arc;

use giftlock_core::challenge::{ChallengeRequirements, ChallengeType};
use giftlock_core::gift::DeliveryMethod;
use giftlock_db::{GiftStore, MemoryGiftStore};
use giftlock_events::delivery::recording::{RecordingEmail, RecordingSms};
use giftlock_events::{EventBus, LifecycleEvent, NotificationGateway};
use giftlock_lifecycle::{
    CreateGiftInput, CreatedGift, GiftLifecycle, InboundMessage, InboundRouter, LifecycleContext,
    LifecycleSettings, SenderIdentity,
};
use tokio::sync::broadcast;

pub const SENDER_ID: i64 = 100;
pub const SENDER_PHONE: &str = "+15550009999";
pub const SENDER_EMAIL: &str = "sam@example.com";
pub const RECIPIENT_PHONE: &str = "+15550000001";
pub const RECIPIENT_EMAIL: &str = "alex@example.com";

pub struct Harness {
    pub store: Arc<MemoryGiftStore>,
    pub sms: Arc<RecordingSms>,
    pub email: Arc<RecordingEmail>,
    pub bus: Arc<EventBus>,
    pub events: broadcast::Receiver<LifecycleEvent>,
    pub lifecycle: GiftLifecycle,
    pub router: InboundRouter,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store_layer(|store| store as Arc<dyn GiftStore>)
    }

    /// Build the lifecycle over `layer(store)`, so a test can intercept
    /// store calls. Assertions still read the underlying memory store.
    pub fn with_store_layer(
        layer: impl FnOnce(Arc<MemoryGiftStore>) -> Arc<dyn GiftStore>,
    ) -> Self {
        let store = Arc::new(MemoryGiftStore::new());
        let sms = Arc::new(RecordingSms::new());
        let email = Arc::new(RecordingEmail::new());
        let bus = Arc::new(EventBus::default());
        let events = bus.subscribe();

        let gateway = Arc::new(NotificationGateway::new(
            Some(sms.clone()),
            Some(email.clone()),
            bus.clone(),
        ));
        let ctx = LifecycleContext::new(
            layer(store.clone()),
            gateway,
            bus.clone(),
            LifecycleSettings {
                public_base_url: "https://giftlock.test".to_string(),
                ..Default::default()
            },
        );
        let lifecycle = GiftLifecycle::new(ctx);
        let router = InboundRouter::new(lifecycle.clone());

        Self {
            store,
            sms,
            email,
            bus,
            events,
            lifecycle,
            router,
        }
    }

    pub fn store(&self) -> &dyn GiftStore {
        self.store.as_ref()
    }

    pub async fn create(&self, input: CreateGiftInput) -> CreatedGift {
        self.lifecycle
            .create_gift(&sender(), input)
            .await
            .expect("gift creation should succeed")
    }

    /// Drain every event published so far and return their types.
    pub fn drain_event_types(&mut self) -> Vec<String> {
        let mut types = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            types.push(event.event_type);
        }
        types
    }
}

pub fn sender() -> SenderIdentity {
    SenderIdentity {
        user_id: SENDER_ID,
        name: "Sam".to_string(),
        phone: Some(SENDER_PHONE.to_string()),
        email: Some(SENDER_EMAIL.to_string()),
    }
}

pub fn gift_input(challenge_type: ChallengeType) -> CreateGiftInput {
    CreateGiftInput {
        recipient_name: Some("Alex".to_string()),
        recipient_phone: Some(RECIPIENT_PHONE.to_string()),
        recipient_email: None,
        gift_type: "gift card".to_string(),
        gift_value: Some("$25".to_string()),
        gift_description: Some("Coffee on me".to_string()),
        personal_note: Some("Happy birthday!".to_string()),
        delivery_method: DeliveryMethod::Sms,
        challenge_type,
        challenge_description: "Complete the challenge".to_string(),
        requirements: ChallengeRequirements::default(),
        expires_at: None,
    }
}

pub fn with_steps(mut input: CreateGiftInput, steps: i32) -> CreateGiftInput {
    input.requirements.total_steps = Some(steps);
    input
}

pub fn with_keyword(mut input: CreateGiftInput, keyword: &str) -> CreateGiftInput {
    input.requirements.keyword = Some(keyword.to_string());
    input
}

pub fn sms(body: &str) -> InboundMessage {
    InboundMessage {
        from: RECIPIENT_PHONE.to_string(),
        body: body.to_string(),
        ..Default::default()
    }
}

pub fn mms(url: &str) -> InboundMessage {
    InboundMessage {
        from: RECIPIENT_PHONE.to_string(),
        body: String::new(),
        media_count: 1,
        media_url: Some(url.to_string()),
        media_content_type: Some("image/jpeg".to_string()),
    }
}
