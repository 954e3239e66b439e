//! Well-known notification channel name constants.
//!
//! These must match the channel values recorded in gift event payloads and
//! referenced by the notification gateway.

/// Text message delivered through the SMS provider.
pub const CHANNEL_SMS: &str = "sms";

/// Email delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// All outbound channels, in dispatch order.
pub const ALL_CHANNELS: &[&str] = &[CHANNEL_SMS, CHANNEL_EMAIL];
