//! Pure domain logic for giftlock.
//!
//! Nothing in this crate performs I/O. The lifecycle engine, persistence
//! layer, and HTTP API all build on the types and rules defined here.

pub mod approval;
pub mod challenge;
pub mod channels;
pub mod contact;
pub mod error;
pub mod gift;
pub mod templates;
pub mod types;
pub mod validator;
