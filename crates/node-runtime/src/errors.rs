use crate::container::ConfigError;
use rc_01_ledger::LedgerError;
use rc_02_tx_consensus::ConsensusError;
use rc_03_attack_verdict::VerdictError;
use shared_types::{EntityError, ValidatorId};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Verdict(#[from] VerdictError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("Validator {0} is not part of this cluster")]
    UnknownValidator(ValidatorId),

    #[error("Observation feed {path:?}: {message}")]
    Feed { path: PathBuf, message: String },
}

pub type NodeResult<T> = Result<T, NodeError>;
