//! Background sweep task
//!
//! Holds only a weak reference to the pool so a forgotten `shutdown` does
//! not keep the pool alive; the task exits on the first tick after the last
//! pool clone is dropped.

use super::player_pool::PoolInner;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

pub(crate) struct Sweeper {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Sweeper {
    pub fn spawn(pool: Weak<PoolInner>, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let Some(inner) = pool.upgrade() else {
                    debug!("Pool dropped; sweeper exiting");
                    break;
                };
                inner.sweep().await;
            }
            debug!("Sweeper stopped");
        });

        Self { stop_tx, task }
    }

    /// Signal the task and wait for it to finish its current pass
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Sweeper task ended abnormally: {}", e);
        }
    }
}
