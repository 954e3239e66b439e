//! Inbound SMS webhook.
//!
//! The SMS provider posts each inbound message as a form and sends our
//! response body back to the sender as the reply. Every request gets a
//! `200` with exactly one reply message, including on internal failure,
//! so the provider never retries a message that may already be applied.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Form;
use giftlock_core::templates::REPLY_TEMPORARY_FAILURE;
use giftlock_lifecycle::InboundMessage;
use serde::Deserialize;

use crate::state::AppState;

/// The provider's form fields. Only the first attachment is used.
#[derive(Debug, Deserialize)]
pub struct InboundSmsForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "NumMedia", default)]
    pub num_media: u32,
    #[serde(rename = "MediaUrl0")]
    pub media_url: Option<String>,
    #[serde(rename = "MediaContentType0")]
    pub media_content_type: Option<String>,
}

impl From<InboundSmsForm> for InboundMessage {
    fn from(form: InboundSmsForm) -> Self {
        Self {
            from: form.from,
            body: form.body,
            media_count: form.num_media,
            media_url: form.media_url,
            media_content_type: form.media_content_type,
        }
    }
}

/// POST /api/v1/webhooks/sms
pub async fn inbound_sms(
    State(state): State<AppState>,
    Form(form): Form<InboundSmsForm>,
) -> impl IntoResponse {
    let message = InboundMessage::from(form);

    let reply = match state.inbound.handle(&message).await {
        Ok(reply) => reply.text,
        Err(e) => {
            tracing::error!(from = %message.from, error = %e, "Inbound SMS handling failed");
            REPLY_TEMPORARY_FAILURE.to_string()
        }
    };

    ([(CONTENT_TYPE, "application/xml")], twiml_message(&reply))
}

/// Wrap `text` in a TwiML single-message response.
pub fn twiml_message(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_is_escaped() {
        let xml = twiml_message("Tom & Jerry's <gift>");
        assert!(xml.ends_with(
            "<Response><Message>Tom &amp; Jerry&apos;s &lt;gift&gt;</Message></Response>"
        ));
    }

    #[test]
    fn double_quotes_are_escaped() {
        let xml = twiml_message(r#"Reply "done" when finished"#);
        assert!(xml.contains("<Message>Reply &quot;done&quot; when finished</Message>"));
    }

    #[test]
    fn form_maps_first_attachment() {
        let form = InboundSmsForm {
            from: "+15550000001".to_string(),
            body: String::new(),
            num_media: 2,
            media_url: Some("https://media.example/a.jpg".to_string()),
            media_content_type: Some("image/jpeg".to_string()),
        };

        let message = InboundMessage::from(form);
        assert_eq!(message.media_count, 2);
        assert_eq!(message.media_url.as_deref(), Some("https://media.example/a.jpg"));
    }
}
