//! # Attack Verdict Metrics
//!
//! - `rc_verdict_proposals_total` - Proposals opened by this node
//! - `rc_verdicts_total` - Executed verdicts, labeled by outcome

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref PROPOSALS: IntCounter = register_int_counter!(
        "rc_verdict_proposals_total",
        "Attack proposals opened by this node"
    )
    .expect("Failed to create PROPOSALS metric");

    pub static ref VERDICTS: IntCounterVec = register_int_counter_vec!(
        "rc_verdicts_total",
        "Attack verdicts executed",
        &["verdict"]
    )
    .expect("Failed to create VERDICTS metric");
}

#[cfg(feature = "metrics")]
pub fn record_proposal() {
    PROPOSALS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_verdict(verdict: &str) {
    VERDICTS.with_label_values(&[verdict]).inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_proposal() {}

#[cfg(not(feature = "metrics"))]
pub fn record_verdict(_verdict: &str) {}
