//! # In-Memory Rating Store
//!
//! Reputation of observed (non-validator) ASes on a 0-100 scale. Every AS
//! starts neutral; confirmed attacks cost more than good behaviour earns.

use parking_lot::RwLock;
use serde::Serialize;
use shared_types::{unix_millis, AsNumber, RatingStore};
use std::collections::BTreeMap;

pub const INITIAL_SCORE: f64 = 50.0;
const MAX_SCORE: f64 = 100.0;
const ATTACK_PENALTY: f64 = 15.0;
const GOOD_BEHAVIOR_CREDIT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackRecord {
    pub attack_type: String,
    pub details: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsRating {
    pub score: f64,
    pub attacks: Vec<AttackRecord>,
    pub good_events: u64,
}

impl Default for AsRating {
    fn default() -> Self {
        Self {
            score: INITIAL_SCORE,
            attacks: Vec::new(),
            good_events: 0,
        }
    }
}

#[derive(Default)]
pub struct InMemoryRatingStore {
    ratings: RwLock<BTreeMap<AsNumber, AsRating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rating(&self, subject: AsNumber) -> Option<AsRating> {
        self.ratings.read().get(&subject).cloned()
    }

    pub fn score(&self, subject: AsNumber) -> f64 {
        self.rating(subject).map_or(INITIAL_SCORE, |r| r.score)
    }

    pub fn snapshot(&self) -> BTreeMap<AsNumber, AsRating> {
        self.ratings.read().clone()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn record_attack(&self, subject: AsNumber, attack_type: &str, details: &str) -> Result<(), String> {
        let mut ratings = self.ratings.write();
        let rating = ratings.entry(subject).or_default();
        rating.score = (rating.score - ATTACK_PENALTY).max(0.0);
        rating.attacks.push(AttackRecord {
            attack_type: attack_type.to_string(),
            details: details.to_string(),
            timestamp: unix_millis(),
        });
        Ok(())
    }

    fn record_good_behavior(&self, subject: AsNumber, _kind: &str) -> Result<(), String> {
        let mut ratings = self.ratings.write();
        let rating = ratings.entry(subject).or_default();
        rating.score = (rating.score + GOOD_BEHAVIOR_CREDIT).min(MAX_SCORE);
        rating.good_events += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_lowers_score() {
        let store = InMemoryRatingStore::new();
        store.record_attack(64666, "prefix_hijack", "origin mismatch").unwrap();

        let rating = store.rating(64666).unwrap();
        assert_eq!(rating.score, 35.0);
        assert_eq!(rating.attacks.len(), 1);
        assert_eq!(store.score(65000), INITIAL_SCORE);
    }

    #[test]
    fn test_score_bounded() {
        let store = InMemoryRatingStore::new();
        for _ in 0..10 {
            store.record_attack(1, "route_leak", "").unwrap();
        }
        assert_eq!(store.score(1), 0.0);

        for _ in 0..100 {
            store.record_good_behavior(2, "confirmed_announcement").unwrap();
        }
        assert_eq!(store.score(2), MAX_SCORE);
        assert_eq!(store.rating(2).unwrap().good_events, 100);
    }
}
