//! Entity models mapping to database rows.
//!
//! Each model derives `FromRow` for the PostgreSQL store and `Serialize`
//! for API responses. Enumerated columns are stored as TEXT and decoded
//! through the core types' `TryFrom<String>` impls.

pub mod challenge;
pub mod gift;
pub mod gift_event;
pub mod photo_submission;
