use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VerdictError {
    #[error("Verdict record could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Verdict log I/O error at {path:?}: {message}")]
    Log { path: PathBuf, message: String },

    #[error("Verdict log {path:?} line {line} is malformed: {message}")]
    MalformedLog {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Transaction {0} has no detected attack to propose")]
    NothingToPropose(String),

    #[error("Invalid verdict configuration: {0}")]
    Config(String),
}

pub type VerdictResult<T> = Result<T, VerdictError>;
