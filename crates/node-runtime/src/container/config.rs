//! # Node Configuration
//!
//! One struct for the whole cluster: roster, per-subsystem configs, storage
//! location and background loop cadence.
//!
//! ## Security Requirements
//!
//! - `hmac_secret` MUST NOT be the default zero value outside local runs
//! - The roster size always equals `consensus.total_validators`

use rc_01_ledger::LedgerConfig;
use rc_02_tx_consensus::{ConsensusConfig, QuorumPolicy};
use rc_03_attack_verdict::VerdictConfig;
use shared_types::ValidatorId;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::{Roa, RewardSchedule};

pub const LEDGER_FILE: &str = "chain.json";
pub const VERDICT_DIR: &str = "verdicts";

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub validators: Vec<ValidatorId>,
    /// `None` runs entirely in memory.
    pub data_dir: Option<PathBuf>,
    pub network: String,
    pub consensus: ConsensusConfig,
    pub verdict: VerdictConfig,
    pub rewards: RewardSchedule,
    pub roas: Vec<Roa>,
    /// Cluster secret every validator's HMAC key is derived from.
    pub hmac_secret: [u8; 32],
    pub sweep_interval: Duration,
    pub cache_expiry_interval: Duration,
    /// JSONL observation feed replayed at startup.
    pub observations: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let validators = default_roster(9);
        Self {
            consensus: ConsensusConfig {
                total_validators: validators.len(),
                ..ConsensusConfig::default()
            },
            validators,
            data_dir: None,
            network: LedgerConfig::default().network,
            verdict: VerdictConfig::default(),
            rewards: RewardSchedule::default(),
            roas: Vec::new(),
            hmac_secret: [0u8; 32],
            sweep_interval: Duration::from_secs(1),
            cache_expiry_interval: Duration::from_secs(60),
            observations: None,
        }
    }
}

/// `validator-1` .. `validator-n`.
pub fn default_roster(n: usize) -> Vec<ValidatorId> {
    (1..=n)
        .map(|i| ValidatorId::new(format!("validator-{}", i)))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "SECURITY VIOLATION: HMAC secret is default zero value. \
         Set RC_HMAC_SECRET environment variable or provide in config."
    )]
    InsecureHmacSecret,

    #[error("Validator roster is empty")]
    EmptyRoster,

    #[error("Validator {0} appears more than once in the roster")]
    DuplicateValidator(ValidatorId),

    #[error("Roster has {roster} validators but consensus expects {configured}")]
    RosterMismatch { roster: usize, configured: usize },

    #[error("Background interval {0} must be non-zero")]
    ZeroInterval(&'static str),
}

impl NodeConfig {
    /// Build from defaults plus `RC_*` environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an explicit variable source.
    /// Malformed values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("RC_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(network) = lookup("RC_NETWORK").filter(|n| !n.trim().is_empty()) {
            config.network = network.trim().to_string();
        }
        if let Some(path) = lookup("RC_OBSERVATIONS") {
            config.observations = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("RC_VALIDATORS") {
            match parse_roster(&raw) {
                Some(roster) => {
                    config.consensus.total_validators = roster.len();
                    config.validators = roster;
                }
                None => warn!("[node] RC_VALIDATORS must be a count or a comma-separated id list"),
            }
        }
        if let Some(raw) = lookup("RC_QUORUM") {
            match raw.trim().parse::<usize>() {
                Ok(n) => config.consensus.quorum = QuorumPolicy::Fixed(n),
                Err(_) => warn!("[node] RC_QUORUM must be a positive integer"),
            }
        }
        if let Some(secs) = parse_secs(&lookup, "RC_REGULAR_TIMEOUT_SECS") {
            config.consensus.regular_timeout = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "RC_ATTACK_TIMEOUT_SECS") {
            config.consensus.attack_timeout = secs;
            // Settled proposals live as long as the commits they judge.
            config.verdict.retention = config.consensus.commit_retention();
        }

        if let Some(secret_hex) = lookup("RC_HMAC_SECRET") {
            match hex::decode(secret_hex.trim()) {
                Ok(bytes) if bytes.len() == 32 => {
                    config.hmac_secret.copy_from_slice(&bytes);
                    info!("[node] Loaded HMAC secret from environment");
                }
                _ => warn!("[node] RC_HMAC_SECRET must be 32 bytes (64 hex chars)"),
            }
        }

        config
    }

    pub fn ledger(&self) -> LedgerConfig {
        LedgerConfig {
            network: self.network.clone(),
            path: self.data_dir.as_ref().map(|dir| dir.join(LEDGER_FILE)),
        }
    }

    pub fn verdict_log_path(&self, validator: &ValidatorId) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(VERDICT_DIR).join(format!("{}.jsonl", validator)))
    }

    /// Structural checks. Subsystem configs validate themselves on construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validators.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }
        let mut seen = std::collections::HashSet::new();
        for v in &self.validators {
            if !seen.insert(v) {
                return Err(ConfigError::DuplicateValidator(v.clone()));
            }
        }
        if self.validators.len() != self.consensus.total_validators {
            return Err(ConfigError::RosterMismatch {
                roster: self.validators.len(),
                configured: self.consensus.total_validators,
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("sweep_interval"));
        }
        if self.cache_expiry_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("cache_expiry_interval"));
        }
        Ok(())
    }

    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.hmac_secret == [0u8; 32] {
            return Err(ConfigError::InsecureHmacSecret);
        }
        Ok(())
    }
}

fn parse_roster(raw: &str) -> Option<Vec<ValidatorId>> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<usize>() {
        return (n > 0).then(|| default_roster(n));
    }
    let ids: Vec<ValidatorId> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ValidatorId::new)
        .collect();
    (!ids.is_empty()).then_some(ids)
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!("[node] {} must be a whole number of seconds", key);
            None
        }
    }
}
