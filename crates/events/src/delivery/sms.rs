//! SMS delivery through the Twilio Messages REST API.
//!
//! Transient failures (network errors, HTTP 429 and 5xx) are retried with
//! exponential backoff. Client errors such as an invalid destination number
//! fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{DeliveryResult, SmsProvider};

/// Backoff between attempts: 250 ms, 500 ms, 1 s.
const RETRY_DELAYS_MS: [u64; 3] = [250, 500, 1000];

/// HTTP request timeout for a single attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Twilio returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
}

impl SmsError {
    fn is_transient(&self) -> bool {
        match self {
            SmsError::Request(_) => true,
            SmsError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

// ---------------------------------------------------------------------------
// TwilioConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sending number in `+<digits>` form.
    pub from_number: String,
    pub api_base: String,
}

impl TwilioConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` unless all three credentials are set, which disables
    /// the SMS channel.
    ///
    /// | Variable             | Required | Default                  |
    /// |----------------------|----------|--------------------------|
    /// | `TWILIO_ACCOUNT_SID` | yes      |                          |
    /// | `TWILIO_AUTH_TOKEN`  | yes      |                          |
    /// | `TWILIO_FROM_NUMBER` | yes      |                          |
    /// | `TWILIO_API_BASE`    | no       | `https://api.twilio.com` |
    pub fn from_env() -> Option<Self> {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            account_sid: non_empty("TWILIO_ACCOUNT_SID")?,
            auth_token: non_empty("TWILIO_AUTH_TOKEN")?,
            from_number: non_empty("TWILIO_FROM_NUMBER")?,
            api_base: non_empty("TWILIO_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

// ---------------------------------------------------------------------------
// TwilioSms
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
}

pub struct TwilioSms {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioSms {
    pub fn new(config: TwilioConfig) -> Result<Self, SmsError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Send with retry on transient failures. Returns the message SID.
    async fn deliver(&self, to: &str, body: &str) -> Result<Option<String>, SmsError> {
        let mut attempt = 0;
        loop {
            match self.try_send(to, body).await {
                Ok(sid) => return Ok(sid),
                Err(e) if e.is_transient() && attempt < RETRY_DELAYS_MS.len() => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        to,
                        error = %e,
                        "SMS send attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_DELAYS_MS[attempt])).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_send(&self, to: &str, body: &str) -> Result<Option<String>, SmsError> {
        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<TwilioErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.to_string());
            return Err(SmsError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = response.json().await?;
        Ok(resource.sid)
    }
}

#[async_trait]
impl SmsProvider for TwilioSms {
    async fn send_text(&self, to: &str, body: &str) -> DeliveryResult {
        match self.deliver(to, body).await {
            Ok(sid) => {
                tracing::info!(to, sid = sid.as_deref().unwrap_or(""), "SMS sent");
                DeliveryResult::delivered()
            }
            Err(e) => {
                tracing::error!(to, error = %e, "SMS delivery failed");
                DeliveryResult::failed(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
