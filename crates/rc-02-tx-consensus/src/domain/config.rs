use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Extra time a committed id is remembered past the attack timeout.
pub const COMMIT_RETENTION_MARGIN: Duration = Duration::from_secs(60);

/// How many approvals commit a transaction as Confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuorumPolicy {
    /// Same threshold regardless of network size.
    Fixed(usize),
    /// `ceil(total * percent / 100)`, bounded by `[min, max]`.
    Scaled { percent: u8, min: usize, max: usize },
}

impl QuorumPolicy {
    /// Resolved threshold, always within `1..=total` for a non-empty network.
    pub fn threshold(&self, total: usize) -> usize {
        let raw = match *self {
            Self::Fixed(n) => n,
            Self::Scaled { percent, min, max } => {
                let scaled = (total * percent as usize).div_ceil(100);
                scaled.max(min).min(max.max(min))
            }
        };
        raw.clamp(1, total.max(1))
    }
}

/// Whether the observer's own opinion counts as a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelfVotePolicy {
    /// Quorum needs `threshold` peer votes.
    #[default]
    Off,
    /// One approve vote from the observer is recorded at broadcast.
    Counted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub quorum: QuorumPolicy,
    pub total_validators: usize,
    pub regular_timeout: Duration,
    pub attack_timeout: Duration,
    pub self_vote: SelfVotePolicy,
    /// Upper bound on a single peer send.
    pub peer_send_timeout: Duration,
    /// Minimum spacing between two non-attack submissions for the same
    /// `(subject, prefix)`, measured on observation timestamps.
    pub sampling_window: Duration,
    /// Broadcast to every peer when fewer relevant peers than the
    /// threshold are known.
    pub relevance_fallback_below_quorum: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            quorum: QuorumPolicy::Fixed(3),
            total_validators: 9,
            regular_timeout: Duration::from_secs(60),
            attack_timeout: Duration::from_secs(180),
            self_vote: SelfVotePolicy::Off,
            peer_send_timeout: Duration::from_secs(2),
            sampling_window: Duration::from_secs(3600),
            relevance_fallback_below_quorum: true,
        }
    }
}

impl ConsensusConfig {
    pub fn threshold(&self) -> usize {
        self.quorum.threshold(self.total_validators)
    }

    pub fn timeout_for(&self, is_attack: bool) -> Duration {
        if is_attack {
            self.attack_timeout
        } else {
            self.regular_timeout
        }
    }

    /// How long a committed id is kept to classify late votes as stale.
    /// Any vote for a transaction still arrives well inside the attack timeout.
    pub fn commit_retention(&self) -> Duration {
        self.attack_timeout + COMMIT_RETENTION_MARGIN
    }

    /// Reject configurations that break the quorum bound or timeout ordering.
    ///
    /// `threshold()` clamps, so a fixed value above the network size is
    /// caught here instead of silently shrinking.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_validators == 0 {
            return Err(ConfigError::NoValidators);
        }
        match self.quorum {
            QuorumPolicy::Fixed(0) => return Err(ConfigError::ZeroThreshold),
            QuorumPolicy::Fixed(n) if n > self.total_validators => {
                return Err(ConfigError::ThresholdExceedsValidators {
                    threshold: n,
                    total: self.total_validators,
                })
            }
            _ => {}
        }
        if self.attack_timeout <= self.regular_timeout {
            return Err(ConfigError::TimeoutOrdering {
                regular: self.regular_timeout,
                attack: self.attack_timeout,
            });
        }
        Ok(())
    }
}
