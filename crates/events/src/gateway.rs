//! Notification Gateway: one rendered template, fanned out over SMS and email.
//!
//! Channel selection depends on the [`Audience`] and on which contact fields
//! the gift carries. A channel whose provider is not configured is never
//! attempted. Both channels are attempted concurrently. A failure on one
//! never affects the other, and neither is ever surfaced as an error: the
//! outcome is reported in a [`DispatchReport`], logged, and published as a
//! `notification.failed` event.

use std::sync::Arc;

use giftlock_core::channels::{CHANNEL_EMAIL, CHANNEL_SMS};
use giftlock_core::templates::{render, TemplateData, TemplateKind};
use giftlock_db::models::gift::Gift;
use serde::Serialize;

use crate::bus::{event_types, EventBus, LifecycleEvent};
use crate::delivery::{DeliveryResult, EmailProvider, SmsProvider};

/// Who a notification is for, and how channels are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The recipient, on the channels the gift's delivery method asks for.
    Recipient,
    /// As [`Audience::Recipient`], minus SMS. Used when the recipient is
    /// already getting an inline SMS reply carrying the same news.
    RecipientExceptSms,
    /// The recipient, on every channel with contact info.
    RecipientAllChannels,
    /// The sender, on every channel with contact info.
    Sender,
}

/// Per-channel outcome. `None` means the channel was not attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sms: Option<DeliveryResult>,
    pub email: Option<DeliveryResult>,
}

impl DispatchReport {
    /// True iff at least one attempted channel succeeded.
    pub fn succeeded(&self) -> bool {
        [&self.sms, &self.email]
            .into_iter()
            .flatten()
            .any(|r| r.success)
    }

    pub fn attempted(&self) -> bool {
        self.sms.is_some() || self.email.is_some()
    }
}

pub struct NotificationGateway {
    sms: Option<Arc<dyn SmsProvider>>,
    email: Option<Arc<dyn EmailProvider>>,
    bus: Arc<EventBus>,
}

impl NotificationGateway {
    pub fn new(
        sms: Option<Arc<dyn SmsProvider>>,
        email: Option<Arc<dyn EmailProvider>>,
        bus: Arc<EventBus>,
    ) -> Self {
        if sms.is_none() {
            tracing::warn!("SMS provider not configured, SMS notifications disabled");
        }
        if email.is_none() {
            tracing::warn!("Email provider not configured, email notifications disabled");
        }
        Self { sms, email, bus }
    }

    pub fn sms_enabled(&self) -> bool {
        self.sms.is_some()
    }

    pub fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    /// Notify the gift's recipient on the channels its delivery method names.
    pub async fn send(
        &self,
        gift: &Gift,
        kind: TemplateKind,
        data: &TemplateData,
    ) -> DispatchReport {
        self.dispatch(gift, Audience::Recipient, kind, data).await
    }

    /// Notify `audience` about `gift`.
    pub async fn dispatch(
        &self,
        gift: &Gift,
        audience: Audience,
        kind: TemplateKind,
        data: &TemplateData,
    ) -> DispatchReport {
        let (phone, email) = targets(gift, audience);
        let phone = phone.filter(|_| self.sms.is_some());
        let email = email.filter(|_| self.email.is_some());

        let sms_body = phone.map(|_| render(kind, data).sms_body);

        let sms_future = async {
            match (&self.sms, phone, sms_body.as_deref()) {
                (Some(provider), Some(to), Some(body)) => Some(provider.send_text(to, body).await),
                _ => None,
            }
        };
        let email_future = async {
            match (&self.email, email) {
                (Some(provider), Some(to)) => Some(provider.send_email(to, kind, data).await),
                _ => None,
            }
        };
        let (sms, email) = tokio::join!(sms_future, email_future);

        let report = DispatchReport { sms, email };
        self.record_failures(gift, audience, kind, &report);

        if !report.attempted() {
            tracing::debug!(
                gift_id = gift.id,
                template = %kind,
                ?audience,
                "No reachable channel for notification"
            );
        }
        report
    }

    fn record_failures(
        &self,
        gift: &Gift,
        audience: Audience,
        kind: TemplateKind,
        report: &DispatchReport,
    ) {
        let channels = [(CHANNEL_SMS, &report.sms), (CHANNEL_EMAIL, &report.email)];
        for (channel, result) in channels {
            let Some(result) = result.as_ref().filter(|r| !r.success) else {
                continue;
            };
            tracing::warn!(
                gift_id = gift.id,
                channel,
                template = %kind,
                ?audience,
                error = result.error.as_deref().unwrap_or(""),
                "Notification channel failed"
            );
            self.bus.publish(
                LifecycleEvent::new(event_types::NOTIFICATION_FAILED, gift.id).with_payload(
                    serde_json::json!({
                        "channel": channel,
                        "template": kind.as_str(),
                        "error": result.error,
                    }),
                ),
            );
        }
    }
}

/// Phone and email to use for `audience`, before provider availability.
fn targets(gift: &Gift, audience: Audience) -> (Option<&str>, Option<&str>) {
    let recipient_phone = gift.recipient_phone.as_deref();
    let recipient_email = gift.recipient_email.as_deref();
    match audience {
        Audience::Recipient => (
            recipient_phone.filter(|_| gift.delivery_method.wants_sms()),
            recipient_email.filter(|_| gift.delivery_method.wants_email()),
        ),
        Audience::RecipientExceptSms => (
            None,
            recipient_email.filter(|_| gift.delivery_method.wants_email()),
        ),
        Audience::RecipientAllChannels => (recipient_phone, recipient_email),
        Audience::Sender => (gift.sender_phone.as_deref(), gift.sender_email.as_deref()),
    }
}
