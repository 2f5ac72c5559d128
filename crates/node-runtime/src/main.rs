//! # RPKI Validator Node
//!
//! Starts the validator roster, optionally replays an observation feed,
//! and runs until Ctrl+C.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `RC_*` environment variables
//! 2. Warn if the HMAC secret is the default
//! 3. Open (or create) the ledger and build every validator
//! 4. Spawn peer dispatchers and maintenance loops
//! 5. Replay `RC_OBSERVATIONS` if set
//!
//! ## Shutdown
//!
//! Stops every loop, flushes the ledger and verifies its integrity.

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{NodeConfig, ValidatorCluster};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("===========================================");
    info!("  RPKI Validator Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = NodeConfig::from_env();
    if let Err(e) = config.validate_for_production() {
        warn!("[node] {}", e);
        warn!("[node] Continuing with development settings");
    }
    let feed = config.observations.clone();

    let cluster = ValidatorCluster::build(config).context("Failed to build validator cluster")?;
    cluster.start();

    if let Some(path) = feed {
        cluster
            .replay_file(&path)
            .await
            .with_context(|| format!("Failed to replay {}", path.display()))?;
    }

    info!("[node] Press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    let report = cluster.shutdown().await.context("Shutdown failed")?;
    for (id, stats) in &report.stats {
        info!(
            validator = %id,
            committed = stats.committed,
            confirmed = stats.confirmed,
            single_witness = stats.single_witness,
            pending = stats.pending,
            "[node] Final stats"
        );
    }
    if !report.integrity_valid {
        error!(errors = report.integrity_errors.len(), "[node] Ledger failed verification");
    }
    if !report.diverged_replicas.is_empty() {
        warn!(replicas = ?report.diverged_replicas, "[node] Replicas diverged from canonical chain");
    }
    info!(
        blocks = report.blocks,
        transactions = report.transactions,
        "[node] Shutdown complete"
    );
    Ok(())
}
