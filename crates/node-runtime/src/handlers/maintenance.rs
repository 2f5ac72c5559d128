//! # Maintenance Loop
//!
//! Per-validator background work: the timeout sweep on a short interval and
//! cache expiry on a long one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::container::ValidatorNode;

pub struct MaintenanceHandler {
    node: Arc<ValidatorNode>,
    sweep_interval: Duration,
    expiry_interval: Duration,
}

impl MaintenanceHandler {
    pub fn new(node: Arc<ValidatorNode>, sweep_interval: Duration, expiry_interval: Duration) -> Self {
        Self {
            node,
            sweep_interval,
            expiry_interval,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut sweep = tokio::time::interval(self.sweep_interval);
        let mut expiry = tokio::time::interval(self.expiry_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        expiry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = sweep.tick() => {
                    self.node.sweep().await;
                }
                _ = expiry.tick() => self.node.expire_caches(),
                _ = shutdown.changed() => break,
            }
        }
    }
}
