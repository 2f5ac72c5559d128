//! # In-Memory Reward Ledger
//!
//! Token balances for validators. Every credit and debit is kept in an
//! ordered history so a run can be audited after shutdown.

use parking_lot::Mutex;
use serde::Serialize;
use shared_types::{unix_millis, RewardLedger, ValidatorId};
use std::collections::BTreeMap;
use tracing::debug;

/// Amounts paid for block commits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardSchedule {
    pub block_commit: f64,
    /// Extra for the first commit an engine makes for a subject AS.
    pub first_commit_bonus: f64,
    pub approving_vote: f64,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            block_commit: 10.0,
            first_commit_bonus: 5.0,
            approving_vote: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardEvent {
    pub validator: ValidatorId,
    /// Negative for penalties.
    pub amount: f64,
    pub reason: String,
    pub timestamp: u64,
}

#[derive(Default)]
struct Books {
    balances: BTreeMap<ValidatorId, f64>,
    history: Vec<RewardEvent>,
}

impl Books {
    fn apply(&mut self, validator: &ValidatorId, amount: f64, reason: &str) {
        let balance = self.balances.entry(validator.clone()).or_insert(0.0);
        // Balances never go negative.
        *balance = (*balance + amount).max(0.0);
        self.history.push(RewardEvent {
            validator: validator.clone(),
            amount,
            reason: reason.to_string(),
            timestamp: unix_millis(),
        });
    }
}

#[derive(Default)]
pub struct InMemoryRewardLedger {
    schedule: RewardSchedule,
    books: Mutex<Books>,
}

impl InMemoryRewardLedger {
    pub fn new(schedule: RewardSchedule) -> Self {
        Self {
            schedule,
            books: Mutex::new(Books::default()),
        }
    }

    pub fn balance(&self, validator: &ValidatorId) -> f64 {
        self.books
            .lock()
            .balances
            .get(validator)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn balances(&self) -> BTreeMap<ValidatorId, f64> {
        self.books.lock().balances.clone()
    }

    pub fn history(&self) -> Vec<RewardEvent> {
        self.books.lock().history.clone()
    }

    /// Events with the given reason, in order.
    pub fn events(&self, reason: &str) -> Vec<RewardEvent> {
        self.books
            .lock()
            .history
            .iter()
            .filter(|e| e.reason == reason)
            .cloned()
            .collect()
    }
}

fn check_amount(amount: f64) -> Result<(), String> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(format!("invalid amount {}", amount))
    }
}

impl RewardLedger for InMemoryRewardLedger {
    fn award_block_commit(
        &self,
        committer: &ValidatorId,
        voters: &[ValidatorId],
        is_first: bool,
    ) -> Result<(), String> {
        let mut books = self.books.lock();
        let mut amount = self.schedule.block_commit;
        if is_first {
            amount += self.schedule.first_commit_bonus;
        }
        books.apply(committer, amount, "block_commit");
        for voter in voters.iter().filter(|v| *v != committer) {
            books.apply(voter, self.schedule.approving_vote, "approving_vote");
        }
        debug!(committer = %committer, voters = voters.len(), is_first, "[node] Block commit rewarded");
        Ok(())
    }

    fn award_special_reward(
        &self,
        recipient: &ValidatorId,
        amount: f64,
        reason: &str,
    ) -> Result<(), String> {
        check_amount(amount)?;
        self.books.lock().apply(recipient, amount, reason);
        Ok(())
    }

    fn apply_penalty(&self, offender: &ValidatorId, amount: f64, reason: &str) -> Result<(), String> {
        check_amount(amount)?;
        self.books.lock().apply(offender, -amount, reason);
        Ok(())
    }
}
