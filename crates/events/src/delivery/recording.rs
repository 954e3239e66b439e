//! In-memory providers that record what they were asked to send.
//!
//! Used by tests and local development in place of Twilio and SMTP. Either
//! provider can be switched into a failing mode to exercise degradation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use giftlock_core::templates::{render, TemplateData, TemplateKind};

use super::{DeliveryResult, EmailProvider, SmsProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub to: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub kind: TemplateKind,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<SentSms>>,
    failing: AtomicBool,
}

impl RecordingSms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far. Failed sends are not recorded.
    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, to: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == to)
            .map(|m| m.body)
            .collect()
    }
}

#[async_trait]
impl SmsProvider for RecordingSms {
    async fn send_text(&self, to: &str, body: &str) -> DeliveryResult {
        if self.failing.load(Ordering::SeqCst) {
            return DeliveryResult::failed("SMS provider unavailable");
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentSms {
                to: to.to_string(),
                body: body.to_string(),
            });
        }
        DeliveryResult::delivered()
    }
}

#[derive(Default)]
pub struct RecordingEmail {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingEmail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn kinds_sent_to(&self, to: &str) -> Vec<TemplateKind> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == to)
            .map(|m| m.kind)
            .collect()
    }
}

#[async_trait]
impl EmailProvider for RecordingEmail {
    async fn send_email(
        &self,
        to: &str,
        kind: TemplateKind,
        data: &TemplateData,
    ) -> DeliveryResult {
        if self.failing.load(Ordering::SeqCst) {
            return DeliveryResult::failed("SMTP relay unavailable");
        }
        let rendered = render(kind, data);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentEmail {
                to: to.to_string(),
                kind,
                subject: rendered.email_subject,
                body: rendered.email_body,
            });
        }
        DeliveryResult::delivered()
    }
}
