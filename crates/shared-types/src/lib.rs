//! # Shared Types Crate
//!
//! Entities and collaborator boundaries used by every RPKI-Chain subsystem.
//!
//! ## Design Principles
//!
//! - **Explicit records**: transactions, votes and ledger entries are typed
//!   structs validated at construction, never free-form maps.
//! - **Canonical bytes**: every hash and signature is taken over the same
//!   sorted-key, whitespace-free JSON form (see [`canonical`]).
//! - **Collaborators are ports**: reward, rating, detection, RPKI validation
//!   and signing are traits in [`collaborators`]; the consensus crates never
//!   know which implementation sits behind them.

pub mod canonical;
pub mod collaborators;
pub mod entities;
pub mod errors;

pub use canonical::{canonical_bytes, sha256_hex, ZERO_HASH};
pub use collaborators::{AttackDetector, RatingStore, RewardLedger, RpkiValidator, TransactionSigner};
pub use entities::*;
pub use errors::EntityError;
