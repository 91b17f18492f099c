//! Periodic snapshot push

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::Broadcaster;

/// Push queue and now-playing snapshots every `period` while anyone listens
pub fn spawn_update_loop(broadcaster: Broadcaster, period: Duration) -> JoinHandle<()> {
    info!("Starting update loop every {:?}", period);
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            push_updates(&broadcaster).await;
        }
    })
}

/// One loop iteration; does nothing without categorised subscribers
pub async fn push_updates(broadcaster: &Broadcaster) {
    if !broadcaster.has_subscribers().await {
        return;
    }
    debug!("Pushing periodic updates");
    broadcaster.push_queue().await;
    broadcaster.push_now_playing().await;
}
