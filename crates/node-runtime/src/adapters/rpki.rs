//! # ROA Table
//!
//! Route-origin validation against a static set of ROAs. The result is
//! attached to transactions for audit only; it never decides a vote.

use serde::{Deserialize, Serialize};
use shared_types::{AsNumber, Observation, RpkiValidation, RpkiValidator};
use std::net::IpAddr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roa {
    pub prefix: String,
    pub max_length: u8,
    pub origin: AsNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Net {
    bits: u128,
    len: u8,
    v6: bool,
}

impl Net {
    fn parse(prefix: &str) -> Option<Self> {
        let (addr, len) = prefix.trim().split_once('/')?;
        let len: u8 = len.parse().ok()?;
        match addr.parse::<IpAddr>().ok()? {
            IpAddr::V4(v4) if len <= 32 => Some(Self {
                bits: u128::from(u32::from(v4)) << 96,
                len,
                v6: false,
            }),
            IpAddr::V6(v6) if len <= 128 => Some(Self {
                bits: u128::from(v6),
                len,
                v6: true,
            }),
            _ => None,
        }
    }

    fn masked(&self, len: u8) -> u128 {
        match len {
            0 => 0,
            l => self.bits & (u128::MAX << (128 - u32::from(l))),
        }
    }

    fn covers(&self, other: &Net) -> bool {
        self.v6 == other.v6 && self.len <= other.len && self.masked(self.len) == other.masked(self.len)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoaTable {
    roas: Vec<(Net, Roa)>,
}

impl RoaTable {
    /// Build a table. ROAs with an unparseable prefix are skipped.
    pub fn new(roas: impl IntoIterator<Item = Roa>) -> Self {
        let roas = roas
            .into_iter()
            .filter_map(|roa| Net::parse(&roa.prefix).map(|net| (net, roa)))
            .collect();
        Self { roas }
    }

    pub fn len(&self) -> usize {
        self.roas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roas.is_empty()
    }
}

fn result(valid: bool, status: &str) -> RpkiValidation {
    RpkiValidation {
        valid,
        status: status.to_string(),
    }
}

impl RpkiValidator for RoaTable {
    fn validate(&self, observation: &Observation) -> RpkiValidation {
        let Some(announced) = Net::parse(&observation.prefix) else {
            return result(false, "malformed_prefix");
        };
        let origin = observation.origin_asn();

        let covering: Vec<&Roa> = self
            .roas
            .iter()
            .filter(|(net, _)| net.covers(&announced))
            .map(|(_, roa)| roa)
            .collect();
        if covering.is_empty() {
            return result(false, "not_found");
        }

        let matching: Vec<&&Roa> = covering.iter().filter(|r| r.origin == origin).collect();
        if matching.is_empty() {
            return result(false, "invalid_origin");
        }
        if matching.iter().any(|r| announced.len <= r.max_length) {
            result(true, "valid")
        } else {
            result(false, "invalid_length")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoaTable {
        RoaTable::new(vec![
            Roa {
                prefix: "192.0.2.0/24".into(),
                max_length: 24,
                origin: 64500,
            },
            Roa {
                prefix: "2001:db8::/32".into(),
                max_length: 48,
                origin: 64501,
            },
            Roa {
                prefix: "not-a-prefix".into(),
                max_length: 8,
                origin: 1,
            },
        ])
    }

    fn announce(prefix: &str, path: Vec<AsNumber>) -> Observation {
        Observation {
            subject_asn: *path.last().unwrap_or(&1),
            prefix: prefix.into(),
            as_path: path,
            timestamp: 0,
            is_attack: false,
            label: String::new(),
        }
    }

    #[test]
    fn test_origin_validation() {
        let roas = table();
        assert_eq!(roas.len(), 2);

        assert_eq!(roas.validate(&announce("192.0.2.0/24", vec![3356, 64500])).status, "valid");
        assert_eq!(
            roas.validate(&announce("192.0.2.0/24", vec![3356, 64666])).status,
            "invalid_origin"
        );
        assert_eq!(
            roas.validate(&announce("192.0.2.128/25", vec![64500])).status,
            "invalid_length"
        );
        assert_eq!(roas.validate(&announce("198.51.100.0/24", vec![64500])).status, "not_found");
    }

    #[test]
    fn test_ipv6_and_malformed() {
        let roas = table();
        let v6 = roas.validate(&announce("2001:db8:1::/48", vec![64501]));
        assert!(v6.valid);
        assert_eq!(roas.validate(&announce("garbage", vec![64501])).status, "malformed_prefix");
        assert_eq!(roas.validate(&announce("10.0.0.0/33", vec![64501])).status, "malformed_prefix");
    }
}
