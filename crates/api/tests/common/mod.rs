//! Shared API test harness: the production router over an in-memory store
//! and recording providers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use giftlock_api::auth::jwt::{encode_token, Claims, JwtConfig};
use giftlock_api::config::ServerConfig;
use giftlock_api::router::build_app_router;
use giftlock_api::state::AppState;
use giftlock_db::MemoryGiftStore;
use giftlock_events::delivery::recording::{RecordingEmail, RecordingSms};
use giftlock_events::{EventBus, EventPersistence, NotificationGateway};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const SENDER_ID: i64 = 7;
pub const OTHER_SENDER_ID: i64 = 8;
pub const RECIPIENT_PHONE: &str = "+15550000001";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        public_base_url: "https://giftlock.test".to_string(),
        gift_lifetime_days: 7,
        expiry_sweep_secs: 300,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryGiftStore>,
    pub sms: Arc<RecordingSms>,
    pub email: Arc<RecordingEmail>,
    pub state: AppState,
}

impl TestApp {
    /// Must be called inside a Tokio runtime: event persistence is spawned.
    pub fn new() -> Self {
        let store = Arc::new(MemoryGiftStore::new());
        let sms = Arc::new(RecordingSms::new());
        let email = Arc::new(RecordingEmail::new());
        let bus = Arc::new(EventBus::default());

        tokio::spawn(EventPersistence::run(store.clone(), bus.subscribe()));

        let gateway = Arc::new(NotificationGateway::new(
            Some(sms.clone()),
            Some(email.clone()),
            bus.clone(),
        ));
        let state = AppState::new(store.clone(), gateway, bus, test_config());

        Self {
            router: build_app_router(state.clone()),
            store,
            sms,
            email,
            state,
        }
    }

    pub fn token(&self, user_id: i64) -> String {
        let config = &self.state.config.jwt;
        let claims = Claims::for_sender(user_id, "Sam", config)
            .with_contact(Some("+15550009999".to_string()), Some("sam@example.com".to_string()));
        encode_token(&claims, config).expect("token should encode")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, user_id: Option<i64>) -> Response<Body> {
        self.send(self.request(Method::GET, uri, user_id, Body::empty(), None))
            .await
    }

    pub async fn delete(&self, uri: &str, user_id: i64) -> Response<Body> {
        self.send(self.request(Method::DELETE, uri, Some(user_id), Body::empty(), None))
            .await
    }

    pub async fn post_json(&self, uri: &str, user_id: Option<i64>, body: Value) -> Response<Body> {
        self.send(self.request(
            Method::POST,
            uri,
            user_id,
            Body::from(body.to_string()),
            Some("application/json"),
        ))
        .await
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> Response<Body> {
        self.send(self.request(
            Method::POST,
            uri,
            None,
            Body::from(form.to_string()),
            Some("application/x-www-form-urlencoded"),
        ))
        .await
    }

    /// Create a gift as `SENDER_ID` and return the `data` object.
    pub async fn create_gift(&self, body: Value) -> Value {
        let response = self.post_json("/api/v1/gifts", Some(SENDER_ID), body).await;
        assert_eq!(response.status(), 201);
        body_json(response).await["data"].clone()
    }

    fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<i64>,
        body: Body,
        content_type: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token(user_id)),
            );
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(body).expect("request should build")
    }
}

pub fn text_gift(steps: i32) -> Value {
    serde_json::json!({
        "recipient_name": "Alex",
        "recipient_phone": "(555) 000-0001",
        "gift_type": "gift card",
        "gift_value": "$25",
        "delivery_method": "sms",
        "challenge_type": "text",
        "challenge_description": "Tell me about your day",
        "requirements": { "total_steps": steps },
    })
}

pub fn photo_gift() -> Value {
    serde_json::json!({
        "recipient_phone": RECIPIENT_PHONE,
        "gift_type": "concert tickets",
        "gift_value": "2x front row",
        "delivery_method": "sms",
        "challenge_type": "photo",
        "challenge_description": "Send a photo of your new plant",
    })
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body should be JSON")
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("body should be UTF-8")
}
