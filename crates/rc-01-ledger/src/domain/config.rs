use std::path::PathBuf;

/// Where the canonical chain lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Written into the ledger file; a file from another network is refused.
    pub network: String,
    /// `None` keeps the chain in memory only.
    pub path: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network: "rpki-chain-local".to_string(),
            path: None,
        }
    }
}
