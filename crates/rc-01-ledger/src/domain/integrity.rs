//! # Integrity Verification
//!
//! Full-chain audit. Every mismatch is collected so operators can judge
//! how many blocks are affected before deciding how to recover.

use super::errors::short;
use super::Block;
use shared_types::ZERO_HASH;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    HashMismatch {
        block: u64,
        stated: String,
        computed: String,
    },
    MerkleMismatch {
        block: u64,
        stated: String,
        computed: String,
    },
    LinkageBroken {
        block: u64,
        expected: String,
        actual: String,
    },
    OutOfSequence {
        position: usize,
        block: u64,
    },
    GenesisParent {
        actual: String,
    },
    Unhashable {
        block: u64,
        reason: String,
    },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashMismatch { block, stated, computed } => write!(
                f,
                "Block {}: hash mismatch (stated {}, computed {})",
                block,
                short(stated),
                short(computed)
            ),
            Self::MerkleMismatch { block, stated, computed } => write!(
                f,
                "Block {}: merkle root mismatch (stated {}, computed {})",
                block,
                short(stated),
                short(computed)
            ),
            Self::LinkageBroken { block, expected, actual } => write!(
                f,
                "Block {}: previous hash {} does not match block {} hash {}",
                block,
                short(actual),
                block.saturating_sub(1),
                short(expected)
            ),
            Self::OutOfSequence { position, block } => {
                write!(f, "Position {}: holds block number {}", position, block)
            }
            Self::GenesisParent { actual } => {
                write!(f, "Block 0: previous hash {} is not the zero sentinel", short(actual))
            }
            Self::Unhashable { block, reason } => {
                write!(f, "Block {}: could not be hashed ({})", block, reason)
            }
        }
    }
}

/// Outcome of [`verify_blocks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub valid: bool,
    pub blocks_checked: usize,
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    /// Human-readable error lines, one per violation.
    pub fn errors(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    /// Distinct block numbers with at least one violation.
    pub fn affected_blocks(&self) -> usize {
        let mut blocks: Vec<u64> = self
            .violations
            .iter()
            .map(|v| match v {
                IntegrityViolation::HashMismatch { block, .. }
                | IntegrityViolation::MerkleMismatch { block, .. }
                | IntegrityViolation::LinkageBroken { block, .. }
                | IntegrityViolation::OutOfSequence { block, .. }
                | IntegrityViolation::Unhashable { block, .. } => *block,
                IntegrityViolation::GenesisParent { .. } => 0,
            })
            .collect();
        blocks.sort_unstable();
        blocks.dedup();
        blocks.len()
    }
}

/// Walk every block, recomputing hash and Merkle root and checking linkage.
pub fn verify_blocks(blocks: &[Block]) -> IntegrityReport {
    let mut violations = Vec::new();

    for (position, block) in blocks.iter().enumerate() {
        if block.block_number != position as u64 {
            violations.push(IntegrityViolation::OutOfSequence {
                position,
                block: block.block_number,
            });
        }

        match block.compute_merkle_root() {
            Ok(computed) if computed != block.merkle_root => {
                violations.push(IntegrityViolation::MerkleMismatch {
                    block: block.block_number,
                    stated: block.merkle_root.clone(),
                    computed,
                })
            }
            Ok(_) => {}
            Err(e) => violations.push(IntegrityViolation::Unhashable {
                block: block.block_number,
                reason: e.to_string(),
            }),
        }

        match block.compute_hash() {
            Ok(computed) if computed != block.block_hash => {
                violations.push(IntegrityViolation::HashMismatch {
                    block: block.block_number,
                    stated: block.block_hash.clone(),
                    computed,
                })
            }
            Ok(_) => {}
            Err(e) => violations.push(IntegrityViolation::Unhashable {
                block: block.block_number,
                reason: e.to_string(),
            }),
        }

        if position == 0 {
            if block.previous_hash != ZERO_HASH {
                violations.push(IntegrityViolation::GenesisParent {
                    actual: block.previous_hash.clone(),
                });
            }
        } else {
            let parent = &blocks[position - 1];
            if block.previous_hash != parent.block_hash {
                violations.push(IntegrityViolation::LinkageBroken {
                    block: block.block_number,
                    expected: parent.block_hash.clone(),
                    actual: block.previous_hash.clone(),
                });
            }
        }
    }

    IntegrityReport {
        valid: violations.is_empty(),
        blocks_checked: blocks.len(),
        violations,
    }
}
