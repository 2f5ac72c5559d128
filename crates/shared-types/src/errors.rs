//! # Error Types
//!
//! Construction-time validation failures for shared entities.

use thiserror::Error;

/// Rejections raised while building a [`crate::Transaction`] or [`crate::Vote`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Observer identity was empty.
    #[error("Observer id must not be empty")]
    EmptyObserver,

    /// Observation carried no prefix.
    #[error("Observation prefix must not be empty")]
    EmptyPrefix,

    /// AS 0 is reserved and never a valid subject.
    #[error("Subject AS must be non-zero")]
    ReservedAsn,

    /// Voter identity was empty.
    #[error("Voter id must not be empty")]
    EmptyVoter,

    /// Transaction id was empty.
    #[error("Transaction id must not be empty")]
    EmptyTransactionId,
}
