//! Lifecycle events and outbound notifications for giftlock.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`LifecycleEvent`]: the envelope for everything that happens to a gift.
//! - [`EventPersistence`]: background subscriber that appends every event to
//!   the gift's event log.
//! - [`delivery`]: SMS (Twilio) and email (SMTP) providers.
//! - [`NotificationGateway`]: fans a rendered template out over the channels a
//!   gift can be reached on.

pub mod bus;
pub mod delivery;
pub mod gateway;
pub mod persistence;

pub use bus::{event_types, EventBus, LifecycleEvent};
pub use delivery::email::{EmailConfig, SmtpEmail};
pub use delivery::sms::{TwilioConfig, TwilioSms};
pub use delivery::{DeliveryResult, EmailProvider, SmsProvider};
pub use gateway::{Audience, DispatchReport, NotificationGateway};
pub use persistence::EventPersistence;
