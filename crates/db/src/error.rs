use giftlock_core::types::DbId;

/// Errors surfaced by [`GiftStore`](crate::store::GiftStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Optimistic concurrency miss: the row changed since it was read.
    #[error("{entity} with id {id} was modified concurrently")]
    StaleVersion { entity: &'static str, id: DbId },

    /// The write is illegal in the entity's current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
