//! Periodic sweep that moves overdue gifts to `expired`.

use std::time::Duration;

use chrono::Utc;
use giftlock_lifecycle::GiftLifecycle;
use tokio_util::sync::CancellationToken;

/// Run the expiry sweep every `interval` until `cancel` is triggered.
pub async fn run(lifecycle: GiftLifecycle, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Gift expiry job started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Gift expiry job stopping");
                break;
            }
            _ = ticker.tick() => {
                match lifecycle.expire_overdue(Utc::now()).await {
                    Ok(0) => tracing::debug!("Gift expiry: nothing overdue"),
                    Ok(expired) => tracing::info!(expired, "Gift expiry: expired overdue gifts"),
                    Err(e) => tracing::error!(error = %e, "Gift expiry: sweep failed"),
                }
            }
        }
    }
}
