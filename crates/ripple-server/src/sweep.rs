use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use ripple_store::ConversationStore;

/// Background task that expires disappearing messages.
///
/// Runs on an interval and routes every message past its 24h eligibility
/// through the store's hard-delete path, so room members get the same
/// `message:deleted` events as a manual delete-for-everyone.
pub async fn run_sweep_loop(store: ConversationStore, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let store = store.clone();
        let swept =
            tokio::task::spawn_blocking(move || store.sweep_disappearing(Utc::now())).await;

        match swept {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Sweep: expired {} disappearing messages", count);
                }
            }
            Ok(Err(e)) => warn!("Sweep error: {}", e),
            Err(e) => warn!("Sweep join error: {}", e),
        }
    }
}
