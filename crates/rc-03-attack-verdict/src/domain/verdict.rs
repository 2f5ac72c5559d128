use super::{AttackProposal, VerdictChoice, VerdictVote};
use serde::{Deserialize, Serialize};
use shared_types::{unix_millis, AsNumber, ValidatorId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    AttackConfirmed,
    NotAttack,
    /// Tie. Never triggers rewards or penalties.
    Disputed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AttackConfirmed => "ATTACK_CONFIRMED",
            Self::NotAttack => "NOT_ATTACK",
            Self::Disputed => "DISPUTED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictOutcome {
    pub verdict: Verdict,
    pub confidence: f64,
    pub yes_votes: usize,
    pub no_votes: usize,
}

impl VerdictOutcome {
    pub fn total_votes(&self) -> usize {
        self.yes_votes + self.no_votes
    }
}

/// Majority rule. A tie (including no votes) is `Disputed` at 0.5.
pub fn tally(yes: usize, no: usize) -> VerdictOutcome {
    let total = (yes + no) as f64;
    let (verdict, confidence) = if yes > no {
        (Verdict::AttackConfirmed, yes as f64 / total)
    } else if no > yes {
        (Verdict::NotAttack, no as f64 / total)
    } else {
        (Verdict::Disputed, 0.5)
    };
    VerdictOutcome {
        verdict,
        confidence,
        yes_votes: yes,
        no_votes: no,
    }
}

/// One line of the verdict log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub proposal_id: String,
    pub transaction_id: String,
    pub subject_asn: AsNumber,
    pub attack_type: String,
    pub proposer_id: ValidatorId,
    pub verdict: Verdict,
    pub confidence: f64,
    pub yes_votes: usize,
    pub no_votes: usize,
    pub total_votes: usize,
    pub votes: Vec<VerdictVote>,
    pub executed_by: ValidatorId,
    /// Whether this node applied rewards, penalties and ratings.
    pub side_effects_applied: bool,
    pub executed_at: u64,
}

impl VerdictRecord {
    pub fn new(
        proposal: &AttackProposal,
        outcome: VerdictOutcome,
        executed_by: ValidatorId,
        side_effects_applied: bool,
    ) -> Self {
        Self {
            proposal_id: proposal.proposal_id.clone(),
            transaction_id: proposal.transaction_id.clone(),
            subject_asn: proposal.subject_asn,
            attack_type: proposal.attack.attack_type.clone(),
            proposer_id: proposal.proposer_id.clone(),
            verdict: outcome.verdict,
            confidence: outcome.confidence,
            yes_votes: outcome.yes_votes,
            no_votes: outcome.no_votes,
            total_votes: outcome.total_votes(),
            votes: proposal.votes.values().cloned().collect(),
            executed_by,
            side_effects_applied,
            executed_at: unix_millis(),
        }
    }

    pub fn voters(&self, choice: VerdictChoice) -> Vec<ValidatorId> {
        self.votes
            .iter()
            .filter(|v| v.choice == choice)
            .map(|v| v.voter_id.clone())
            .collect()
    }
}
