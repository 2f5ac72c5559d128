//! # Transaction Consensus (rc-02)
//!
//! Collects peer votes on BGP-observation transactions and commits each
//! one to the ledger exactly once, either when approvals reach quorum or
//! when its timeout elapses.
//!
//! ## Transaction lifecycle
//!
//! ```text
//! broadcast ──▶ Pending ──(approve >= threshold)──▶ Committed: CONFIRMED
//!                  │
//!                  └──(age >= timeout)──▶ Committed: CONFIRMED
//!                                                   INSUFFICIENT_CONSENSUS
//!                                                   SINGLE_WITNESS
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | One vote per voter | Votes are keyed by voter id; a second vote is a replay |
//! | Bounded votes | A tracker never holds more votes than there are validators |
//! | Exactly-once commit | Quorum and timeout race through one claim on the `committed` set |
//! | Timeout ordering | Attack transactions wait strictly longer than regular ones |
//! | No I/O under lock | Ledger, network and callbacks run after the pool guard drops |
//!
//! ## Crate Structure
//!
//! - `domain/` - Config, vote tracker, pool, sampling cache, relevance index, stats
//! - `ports/` - `ConsensusApi` (inbound); `PeerTransport`, `KnowledgeBase`, `CommitHook` (outbound)
//! - `adapters/` - No-op hook and fixed-opinion knowledge base
//! - `service/` - `ConsensusEngine`

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{FixedOpinion, NoopCommitHook};
pub use domain::{
    ConfigError, ConsensusConfig, ConsensusError, ConsensusResult, EngineStats,
    PeerDeliveryStats, QuorumPolicy, RelevanceIndex, SamplingCache, SelfVotePolicy, VotePool,
    VoteRejection, VoteTally, VoteTracker,
};
pub use ports::{CommitHook, ConsensusApi, KnowledgeBase, PeerTransport};
pub use service::{
    BroadcastReport, CommitReceipt, CommitTrigger, ConsensusDependencies, ConsensusEngine,
    VoteOutcome,
};
