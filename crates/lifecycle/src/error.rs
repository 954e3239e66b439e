use giftlock_core::error::CoreError;
use giftlock_db::StoreError;

/// Errors returned by lifecycle operations.
///
/// Store outcomes that mean something to the caller (missing rows, illegal
/// transitions, lost races) are folded into [`CoreError`]; only genuine
/// persistence failures stay as [`LifecycleError::Store`].
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id }.into(),
            StoreError::Conflict(msg) => CoreError::Conflict(msg).into(),
            StoreError::StaleVersion { entity, id } => CoreError::Conflict(format!(
                "{entity} {id} is being updated concurrently, please retry"
            ))
            .into(),
            other => LifecycleError::Store(other),
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
