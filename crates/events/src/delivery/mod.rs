//! Outbound notification providers.
//!
//! Providers never fail the caller: every send returns a [`DeliveryResult`]
//! carrying a success flag and the provider error text, if any.

use async_trait::async_trait;
use giftlock_core::templates::{TemplateData, TemplateKind};
use serde::Serialize;

pub mod email;
pub mod recording;
pub mod sms;

/// Outcome of one provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub success: bool,
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn delivered() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Sends a plain text message to a phone number.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> DeliveryResult;
}

/// Sends a templated email to an address.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_email(&self, to: &str, kind: TemplateKind, data: &TemplateData)
        -> DeliveryResult;
}
