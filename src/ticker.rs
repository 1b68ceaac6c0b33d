//! Periodic tick driver
//!
//! Calls [`CookingEngine::tick`] on a fixed period until cancelled. The
//! engine lock is held only for the duration of one tick.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::engine::CookingEngine;

/// Engine shared between the ticker and its callers
pub type SharedEngine = Arc<Mutex<CookingEngine>>;

/// Wrap an engine for sharing with the ticker
pub fn shared(engine: CookingEngine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

/// Spawn the tick loop on the current tokio runtime
///
/// The first tick happens one full `period` after spawning. The task
/// resolves to the number of ticks performed once `cancel` fires.
pub fn spawn_ticker(
    engine: SharedEngine,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<u64> {
    let period = period.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        tracing::info!("Ticker started ({}ms period)", period.as_millis());
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let finished = engine.lock().tick();
                    ticks += 1;
                    if !finished.is_empty() {
                        tracing::debug!("Tick {}: {} timer(s) finished", ticks, finished.len());
                    }
                }
            }
        }

        tracing::info!("Ticker stopped after {} ticks", ticks);
        ticks
    })
}
