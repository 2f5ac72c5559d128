//! End-to-end flows across rc-01, rc-02, rc-03 and node-runtime.

#[cfg(test)]
pub(crate) mod harness;

mod attack_verdict;
mod cluster;
mod commit_race;
mod quorum_commit;
mod timeouts;
