//! # Attack Verdict Consensus (rc-03)
//!
//! A second, lighter vote that runs on top of committed transactions. When
//! a node's detector flags a committed observation it opens an
//! `AttackProposal` with its own YES vote; every peer re-runs its detector
//! and answers YES or NO. Once `min_votes` votes exist the proposal is
//! executed exactly once by majority rule:
//!
//! | Votes | Verdict | Side effects |
//! |-------|---------|--------------|
//! | YES > NO | `ATTACK_CONFIRMED` | rate the subject, reward proposer and YES voters |
//! | NO > YES | `NOT_ATTACK` | penalize the proposer, reward NO voters |
//! | tie | `DISPUTED` | none |
//!
//! Every executed verdict is appended to the verdict log with its full
//! vote breakdown.
//!
//! ## Crate Structure
//!
//! - `domain/` - Proposals, proposal book, tally, verdict records, config
//! - `ports/` - `AttackVerdictApi` (inbound); `VerdictTransport`, `VerdictLog` (outbound)
//! - `adapters/` - JSONL and in-memory logs, commit hook into rc-02
//! - `service/` - `AttackVerdictConsensus`

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{JsonlVerdictLog, MemoryVerdictLog, VerdictCommitHook};
pub use domain::{
    tally, AttackProposal, BookExpiry, ExecutionPolicy, ProposalBook, ProposalStatus, Verdict,
    VerdictBallot, VerdictChoice, VerdictConfig, VerdictError, VerdictOutcome, VerdictRecord,
    VerdictResult, VerdictVote, VerdictVoteOutcome,
};
pub use ports::{AttackVerdictApi, VerdictLog, VerdictTransport};
pub use service::{AttackVerdictConsensus, VerdictDependencies};
