//! # Adapters
//!
//! Reference implementations of the collaborator ports for an in-process
//! validator cluster.

mod commit_notice;
mod detector;
mod knowledge;
mod ratings;
mod rewards;
mod rpki;
mod signer;

pub use commit_notice::CommitNotifier;
pub use detector::HeuristicDetector;
pub use knowledge::ObservationKnowledge;
pub use ratings::{AsRating, AttackRecord, InMemoryRatingStore, INITIAL_SCORE};
pub use rewards::{InMemoryRewardLedger, RewardEvent, RewardSchedule};
pub use rpki::{Roa, RoaTable};
pub use signer::{HmacSigner, Keyring};
