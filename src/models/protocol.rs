use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RouterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    V2,
    V3,
    Mixed,
}

const PROTOCOL_ALIASES: [(&str, Protocol); 6] = [
    ("uniswap_v2", Protocol::V2),
    ("uniswap_v3", Protocol::V3),
    ("v2_pool", Protocol::V2),
    ("v3_pool", Protocol::V3),
    ("mixed_route", Protocol::Mixed),
    ("v2_v3", Protocol::Mixed),
];

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::V2, Protocol::V3, Protocol::Mixed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::V2 => "V2",
            Protocol::V3 => "V3",
            Protocol::Mixed => "MIXED",
        }
    }

    /// Sorted, de-duplicated protocol list used in cache keys.
    pub fn canonical_set(protocols: &[Protocol]) -> Vec<Protocol> {
        let mut sorted = protocols.to_vec();
        sorted.sort();
        sorted.dedup();
        sorted
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = RouterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_protocol_name(value);
        Protocol::ALL
            .iter()
            .copied()
            .find(|protocol| protocol.as_str().eq_ignore_ascii_case(&normalized))
            .or_else(|| {
                PROTOCOL_ALIASES
                    .iter()
                    .find_map(|(alias, protocol)| (*alias == normalized).then_some(*protocol))
            })
            .ok_or_else(|| RouterError::invalid(format!("Unknown protocol: {value}")))
    }
}

fn normalize_protocol_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        let cases = [
            ("v2", Protocol::V2),
            ("V3", Protocol::V3),
            ("mixed", Protocol::Mixed),
            ("Uniswap-V3", Protocol::V3),
            ("uniswap v2", Protocol::V2),
            ("mixed route", Protocol::Mixed),
        ];
        for (name, expected) in cases {
            assert_eq!(name.parse::<Protocol>().expect(name), expected, "{name}");
        }
    }

    #[test]
    fn rejects_unknown_protocol() {
        let err = "curve".parse::<Protocol>().expect_err("unknown protocol");
        assert!(err.message().contains("curve"));
    }

    #[test]
    fn canonical_set_sorts_and_dedups() {
        let set = Protocol::canonical_set(&[Protocol::Mixed, Protocol::V3, Protocol::V2, Protocol::V3]);
        assert_eq!(set, vec![Protocol::V2, Protocol::V3, Protocol::Mixed]);
    }
}
