//! # Heuristic Attack Detector
//!
//! Rule-based detector for replayed feeds: the feed's label names the
//! attack class, and an optional ROA table catches origin hijacks the
//! label missed. Pure: no state is touched.

use super::RoaTable;
use shared_types::{AttackDetector, AttackFinding, Observation, RpkiValidator, Severity};
use std::sync::Arc;

const LABEL_RULES: &[(&str, &str, Severity)] = &[
    ("hijack", "prefix_hijack", Severity::High),
    ("subprefix", "subprefix_hijack", Severity::Critical),
    ("leak", "route_leak", Severity::Medium),
    ("forged", "path_forgery", Severity::High),
    ("bogon", "bogon_announcement", Severity::Low),
];

#[derive(Default)]
pub struct HeuristicDetector {
    roas: Option<Arc<RoaTable>>,
}

impl HeuristicDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roas(roas: Arc<RoaTable>) -> Self {
        Self { roas: Some(roas) }
    }
}

impl AttackDetector for HeuristicDetector {
    fn detect(&self, observation: &Observation) -> Result<Vec<AttackFinding>, String> {
        let label = observation.label.to_ascii_lowercase();
        let mut findings: Vec<AttackFinding> = LABEL_RULES
            .iter()
            .filter(|(needle, _, _)| label.contains(needle))
            .map(|(_, attack_type, severity)| AttackFinding {
                attack_type: attack_type.to_string(),
                severity: *severity,
                details: format!("feed label '{}'", observation.label),
            })
            .collect();

        if let Some(roas) = &self.roas {
            let rov = roas.validate(observation);
            let already = findings.iter().any(|f| f.attack_type == "prefix_hijack");
            if rov.status == "invalid_origin" && !already {
                findings.push(AttackFinding {
                    attack_type: "prefix_hijack".to_string(),
                    severity: Severity::High,
                    details: format!(
                        "origin AS{} not authorized for {}",
                        observation.origin_asn(),
                        observation.prefix
                    ),
                });
            }
        }

        if findings.is_empty() && observation.is_attack {
            findings.push(AttackFinding {
                attack_type: "suspicious_announcement".to_string(),
                severity: Severity::Low,
                details: "flagged by feed".to_string(),
            });
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Roa;

    fn observation(label: &str, is_attack: bool, path: Vec<u32>) -> Observation {
        Observation {
            subject_asn: *path.last().unwrap(),
            prefix: "192.0.2.0/24".into(),
            as_path: path,
            timestamp: 0,
            is_attack,
            label: label.into(),
        }
    }

    #[test]
    fn test_label_rules() {
        let detector = HeuristicDetector::new();
        let findings = detector
            .detect(&observation("Route-Leak", true, vec![174, 64500]))
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].attack_type, "route_leak");
        assert!(detector
            .detect(&observation("normal", false, vec![64500]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unlabelled_attack_flag() {
        let findings = HeuristicDetector::new()
            .detect(&observation("", true, vec![64500]))
            .unwrap();
        assert_eq!(findings[0].attack_type, "suspicious_announcement");
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn test_roa_origin_mismatch() {
        let roas = Arc::new(RoaTable::new(vec![Roa {
            prefix: "192.0.2.0/24".into(),
            max_length: 24,
            origin: 64500,
        }]));
        let detector = HeuristicDetector::with_roas(roas);

        let findings = detector
            .detect(&observation("normal", false, vec![3356, 64666]))
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].attack_type, "prefix_hijack");

        let labelled = detector
            .detect(&observation("hijack", true, vec![3356, 64666]))
            .unwrap();
        assert_eq!(labelled.len(), 1);
    }
}
