//! Shared response envelope types for API handlers.
//!
//! JSON responses use a `{ "data": ... }` envelope. The inbound SMS webhook
//! is the one exception; it answers in the provider's XML format.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
