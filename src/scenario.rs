//! Preset outage scenarios.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CascadeError;

/// Identifier of a preset scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioId {
    DnsCollapse,
    CdnOutage,
    AwsOutage,
}

impl ScenarioId {
    pub const ALL: [ScenarioId; 3] = [
        ScenarioId::DnsCollapse,
        ScenarioId::CdnOutage,
        ScenarioId::AwsOutage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioId::DnsCollapse => "dns-collapse",
            ScenarioId::CdnOutage => "cdn-outage",
            ScenarioId::AwsOutage => "aws-outage",
        }
    }

    /// The full scenario definition for this id.
    pub fn scenario(&self) -> Scenario {
        match self {
            ScenarioId::DnsCollapse => Scenario {
                id: *self,
                label: "DNS Collapse",
                description: "Root DNS servers fail, name resolution breaks globally.",
                kill_nodes: &["dns-root"],
            },
            ScenarioId::CdnOutage => Scenario {
                id: *self,
                label: "CDN Outage",
                description: "All major CDN providers go down simultaneously.",
                kill_nodes: &["cloudflare-cdn", "fastly-cdn", "akamai-cdn"],
            },
            ScenarioId::AwsOutage => Scenario {
                id: *self,
                label: "AWS Outage",
                description: "Amazon Web Services suffers a complete outage.",
                kill_nodes: &["aws"],
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioId {
    type Err = CascadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| CascadeError::unknown_scenario(s))
    }
}

/// A named preset kill set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub label: &'static str,
    pub description: &'static str,
    pub kill_nodes: &'static [&'static str],
}

impl Scenario {
    /// Kill set as owned ids, ready for the propagation engine.
    pub fn kill_ids(&self) -> Vec<String> {
        self.kill_nodes.iter().map(|id| id.to_string()).collect()
    }
}

/// Every preset scenario, in display order.
pub fn scenarios() -> Vec<Scenario> {
    ScenarioId::ALL.iter().map(|id| id.scenario()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::graph::default_nodes;

    #[test]
    fn test_parse_known_ids() {
        assert_eq!(
            "dns-collapse".parse::<ScenarioId>().unwrap(),
            ScenarioId::DnsCollapse
        );
        assert_eq!(
            " aws-outage ".parse::<ScenarioId>().unwrap(),
            ScenarioId::AwsOutage
        );
    }

    #[test]
    fn test_parse_unknown_id() {
        let err = "meteor".parse::<ScenarioId>().unwrap_err();
        assert!(err.is(ErrorCode::UnknownScenario));
    }

    #[test]
    fn test_kill_sets_reference_default_nodes() {
        let nodes = default_nodes();
        for scenario in scenarios() {
            for id in scenario.kill_nodes {
                assert!(nodes.iter().any(|n| n.id == *id), "{} missing", id);
            }
        }
    }

    #[test]
    fn test_scenario_serializes_kebab_id() {
        let value = serde_json::to_value(ScenarioId::CdnOutage.scenario()).unwrap();
        assert_eq!(value["id"], "cdn-outage");
        assert_eq!(value["killNodes"].as_array().map(|a| a.len()), Some(3));
    }
}
