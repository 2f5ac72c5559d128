//! # Peer Message Dispatcher
//!
//! One dispatcher per validator drains its inbox and spawns a task per
//! message, so a slow handler never holds up the messages behind it.
//! Handler tasks belong to the dispatcher: on shutdown it waits for them
//! (up to [`DRAIN_TIMEOUT`]) before returning.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::container::ValidatorNode;
use crate::wiring::{InMemoryNetwork, Inbox};

/// How long shutdown waits for in-flight handlers.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PeerMessageHandler {
    node: Arc<ValidatorNode>,
    network: Arc<InMemoryNetwork>,
    inbox: Inbox,
}

impl PeerMessageHandler {
    pub fn new(node: Arc<ValidatorNode>, network: Arc<InMemoryNetwork>, inbox: Inbox) -> Self {
        Self {
            node,
            network,
            inbox,
        }
    }

    /// Run until the inbox closes or shutdown is signalled, then drain the
    /// handlers still running.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        debug!(validator = %self.node.id(), "[node] Dispatcher started");
        let mut handlers = JoinSet::new();
        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else { break };
                    let node = Arc::clone(&self.node);
                    let network = Arc::clone(&self.network);
                    handlers.spawn(async move {
                        node.handle(message).await;
                        network.complete();
                    });
                }
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        warn!(validator = %self.node.id(), "[node] Message handler panicked: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!(validator = %self.node.id(), "[node] Shutdown signal received");
                    break;
                }
            }
        }
        self.drain(handlers).await;
    }

    async fn drain(&self, mut handlers: JoinSet<()>) {
        if handlers.is_empty() {
            return;
        }
        let pending = handlers.len();
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while let Some(joined) = handlers.join_next().await {
                if let Err(e) = joined {
                    warn!(validator = %self.node.id(), "[node] Message handler panicked: {}", e);
                }
            }
        })
        .await;
        match drained {
            Ok(()) => debug!(validator = %self.node.id(), pending, "[node] Message handlers drained"),
            Err(_) => {
                warn!(
                    validator = %self.node.id(),
                    remaining = handlers.len(),
                    "[node] Message handlers still running after drain timeout, aborting"
                );
                handlers.abort_all();
            }
        }
    }
}
