//! Ticker background task

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info};

use crate::engine::ClockDriver;

/// Background task that ticks the clock driver while a session is running.
///
/// While the driver is stopped the task waits on its running signal instead
/// of ticking, so `stop` also abandons any pending tick wait.
pub async fn ticker_task(engine: Arc<ClockDriver>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    info!("Starting ticker task ({:?} per tick)", period);

    let mut running = engine.running_signal();

    while !*shutdown.borrow() {
        // Wait until a session is running
        tokio::select! {
            _ = shutdown.changed() => break,
            started = async { running.wait_for(|running| *running).await.map(|_| ()) } => {
                if started.is_err() {
                    break;
                }
            }
        }

        debug!("Session running, ticker active");
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Ticker task stopping");
                    return;
                }

                // Session stopped - go back to waiting
                changed = running.changed() => {
                    if changed.is_err() || !*running.borrow_and_update() {
                        debug!("Session stopped, ticker idle");
                        break;
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = engine.tick() {
                        error!("Tick failed, ticker exiting: {}", e);
                        return;
                    }
                }
            }
        }
    }

    info!("Ticker task stopping");
}
