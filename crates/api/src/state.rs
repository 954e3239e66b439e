use std::sync::Arc;

use giftlock_db::GiftStore;
use giftlock_events::{EventBus, NotificationGateway};
use giftlock_lifecycle::{GiftLifecycle, InboundRouter, LifecycleContext};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind `Arc` or is itself a
/// cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GiftStore>,
    pub lifecycle: GiftLifecycle,
    pub inbound: InboundRouter,
    pub config: Arc<ServerConfig>,
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the lifecycle engine to its store, gateway, and bus.
    pub fn new(
        store: Arc<dyn GiftStore>,
        gateway: Arc<NotificationGateway>,
        event_bus: Arc<EventBus>,
        config: ServerConfig,
    ) -> Self {
        let ctx = LifecycleContext::new(
            Arc::clone(&store),
            gateway,
            Arc::clone(&event_bus),
            config.lifecycle_settings(),
        );
        let lifecycle = GiftLifecycle::new(ctx);
        let inbound = InboundRouter::new(lifecycle.clone());

        Self {
            store,
            lifecycle,
            inbound,
            config: Arc::new(config),
            event_bus,
        }
    }
}
