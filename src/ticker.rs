//! Background deadline enforcement.

use crate::session::SessionManager;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

/// Spawns a task that ticks every session once per `period`.
///
/// The task runs until the returned handle is aborted.
#[instrument(skip(manager))]
pub fn spawn(manager: SessionManager, period: Duration) -> JoinHandle<()> {
    info!("Starting session ticker");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let changed = manager.tick_all();
            if !changed.is_empty() {
                debug!(?changed, "Ticker enforced deadlines");
            }
        }
    })
}
