use super::VerdictError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which nodes apply reward, penalty and rating side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionPolicy {
    /// Only the proposer's node; the others log the verdict for audit.
    #[default]
    ProposerOnly,
    /// Every node that reaches the verdict.
    Everywhere,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// Votes needed before a verdict is computed. The proposer's own vote counts.
    pub min_votes: usize,
    pub proposer_reward: f64,
    pub voter_reward: f64,
    /// Charged to the proposer when the vote finds no attack.
    pub false_accusation_penalty: f64,
    pub execution: ExecutionPolicy,
    pub peer_send_timeout: Duration,
    /// How long executed proposals and early ballots are kept.
    pub retention: Duration,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            min_votes: 3,
            proposer_reward: 10.0,
            voter_reward: 2.0,
            false_accusation_penalty: 5.0,
            execution: ExecutionPolicy::ProposerOnly,
            peer_send_timeout: Duration::from_secs(2),
            retention: Duration::from_secs(240),
        }
    }
}

impl VerdictConfig {
    pub fn validate(&self, total_validators: usize) -> Result<(), VerdictError> {
        if self.min_votes == 0 {
            return Err(VerdictError::Config("min_votes must be at least 1".into()));
        }
        if self.min_votes > total_validators {
            return Err(VerdictError::Config(format!(
                "min_votes {} exceeds validator count {}",
                self.min_votes, total_validators
            )));
        }
        let amounts = [
            self.proposer_reward,
            self.voter_reward,
            self.false_accusation_penalty,
        ];
        if amounts.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(VerdictError::Config(
                "reward and penalty amounts must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}
