//! # Transaction Consensus Metrics
//!
//! Prometheus metrics, compiled in with the `metrics` feature:
//! ```toml
//! rc-02-tx-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `rc_consensus_commits_total` - Commits, labeled by consensus status
//! - `rc_consensus_votes_rejected_total` - Rejected votes, labeled by reason
//! - `rc_consensus_peer_send_failures_total` - Failed or timed-out peer sends
//! - `rc_consensus_ledger_failures_total` - Ledger appends that failed
//! - `rc_consensus_pending_transactions` - Trackers currently pending

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref COMMITS: IntCounterVec = register_int_counter_vec!(
        "rc_consensus_commits_total",
        "Transactions committed to the ledger",
        &["status"]
    )
    .expect("Failed to create COMMITS metric");

    pub static ref VOTES_REJECTED: IntCounterVec = register_int_counter_vec!(
        "rc_consensus_votes_rejected_total",
        "Votes rejected by the pool",
        &["reason"]
    )
    .expect("Failed to create VOTES_REJECTED metric");

    pub static ref PEER_SEND_FAILURES: IntCounter = register_int_counter!(
        "rc_consensus_peer_send_failures_total",
        "Peer sends that failed or timed out"
    )
    .expect("Failed to create PEER_SEND_FAILURES metric");

    pub static ref LEDGER_FAILURES: IntCounter = register_int_counter!(
        "rc_consensus_ledger_failures_total",
        "Ledger appends that failed after a commit was claimed"
    )
    .expect("Failed to create LEDGER_FAILURES metric");

    pub static ref PENDING: IntGauge = register_int_gauge!(
        "rc_consensus_pending_transactions",
        "Transactions waiting for votes"
    )
    .expect("Failed to create PENDING metric");
}

#[cfg(feature = "metrics")]
pub fn record_commit(status: &str) {
    COMMITS.with_label_values(&[status]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_vote_rejected(reason: &str) {
    VOTES_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_peer_send_failure() {
    PEER_SEND_FAILURES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_ledger_failure() {
    LEDGER_FAILURES.inc();
}

#[cfg(feature = "metrics")]
pub fn set_pending(count: usize) {
    PENDING.set(count as i64);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_commit(_status: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_vote_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_peer_send_failure() {}

#[cfg(not(feature = "metrics"))]
pub fn record_ledger_failure() {}

#[cfg(not(feature = "metrics"))]
pub fn set_pending(_count: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_callable_without_feature() {
        record_commit("CONFIRMED");
        record_vote_rejected("replay");
        record_peer_send_failure();
        record_ledger_failure();
        set_pending(3);
    }
}
