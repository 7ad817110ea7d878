//! Weighted health metrics over a status snapshot.

use serde::{Deserialize, Serialize};

use crate::graph::{
    apply_decentralization, baseline_status, default_edges, default_nodes, status_of, InfraNode,
    InfraType, NodeStatus, StatusMap,
};
use crate::propagation::{apply_waves, propagate_failure};

/// Share of a degraded node's users counted as affected.
const DEGRADED_USER_SHARE: f64 = 0.5;
/// Share of a degraded node's hourly impact counted as lost.
const DEGRADED_FINANCIAL_SHARE: f64 = 0.3;

/// Aggregate health of the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// 0-100, weighted by user count
    pub percent_operational: u32,
    /// Millions of users
    pub affected_users: u64,
    /// Millions USD per hour
    pub financial_impact: u64,
    pub services_down: usize,
    pub services_degraded: usize,
    pub services_healthy: usize,
}

impl Metrics {
    /// Metrics of an untouched graph.
    pub fn baseline(nodes: &[InfraNode]) -> Self {
        compute_metrics(nodes, &baseline_status(nodes))
    }
}

/// Reduce a snapshot to weighted metrics.
///
/// Only service nodes count; the end-user sink is the output, not a service.
/// Absent snapshot entries count as healthy. With no weighted services the
/// graph is reported as fully operational.
pub fn compute_metrics(nodes: &[InfraNode], status: &StatusMap) -> Metrics {
    let mut total_weight = 0.0;
    let mut healthy_weight = 0.0;
    let mut affected_users = 0.0;
    let mut financial_impact = 0.0;
    let mut services_down = 0;
    let mut services_degraded = 0;
    let mut services_healthy = 0;

    for node in nodes.iter().filter(|n| n.infra_type != InfraType::User) {
        total_weight += node.user_count;

        match status_of(status, &node.id) {
            NodeStatus::Healthy => {
                healthy_weight += node.user_count;
                services_healthy += 1;
            }
            NodeStatus::Degraded => {
                healthy_weight += node.user_count * DEGRADED_USER_SHARE;
                affected_users += node.user_count * DEGRADED_USER_SHARE;
                financial_impact += node.financial_impact_per_hour * DEGRADED_FINANCIAL_SHARE;
                services_degraded += 1;
            }
            NodeStatus::Down => {
                affected_users += node.user_count;
                financial_impact += node.financial_impact_per_hour;
                services_down += 1;
            }
        }
    }

    let percent_operational = if total_weight > 0.0 {
        (healthy_weight / total_weight * 100.0).round() as u32
    } else {
        100
    };

    Metrics {
        percent_operational,
        affected_users: affected_users.round() as u64,
        financial_impact: financial_impact.round() as u64,
        services_down,
        services_degraded,
        services_healthy,
    }
}

/// Metrics the same kill set would produce on a fully decentralized
/// default graph, for "what if" comparison.
pub fn comparison_metrics<S: AsRef<str>>(kill_ids: &[S]) -> Metrics {
    let (nodes, edges) = apply_decentralization(&default_nodes(), &default_edges(), 100);
    let waves = propagate_failure(&nodes, &edges, kill_ids);
    let status = apply_waves(&baseline_status(&nodes), &waves);
    compute_metrics(&nodes, &status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_healthy_default_graph() {
        let nodes = default_nodes();
        let m = Metrics::baseline(&nodes);
        assert_eq!(m.percent_operational, 100);
        assert_eq!(m.affected_users, 0);
        assert_eq!(m.financial_impact, 0);
        assert_eq!(m.services_healthy, 17);
        assert_eq!(m.services_down, 0);
        assert_eq!(m.services_degraded, 0);
    }

    #[test]
    fn test_empty_snapshot_reads_healthy() {
        let m = compute_metrics(&default_nodes(), &StatusMap::new());
        assert_eq!(m.percent_operational, 100);
        assert_eq!(m.services_healthy, 17);
    }

    #[test]
    fn test_zero_weight_is_fully_operational() {
        let empty = compute_metrics(&[], &StatusMap::new());
        assert_eq!(empty.percent_operational, 100);

        let sink = InfraNode::new("users", "End Users", InfraType::User, "👤", 10.0, 0.0);
        let users_only = vec![sink];
        let mut status = StatusMap::new();
        status.insert("users".to_string(), NodeStatus::Down);
        let m = compute_metrics(&users_only, &status);
        assert_eq!(m.percent_operational, 100);
        assert_eq!(m.affected_users, 0);
        assert_eq!(m.services_down, 0);
    }

    #[test]
    fn test_weighting() {
        let nodes = vec![
            InfraNode::new("a", "A", InfraType::Saas, "x", 100.0, 10.0),
            InfraNode::new("b", "B", InfraType::Saas, "x", 100.0, 10.0),
            InfraNode::new("c", "C", InfraType::Saas, "x", 200.0, 20.0),
        ];
        let mut status = baseline_status(&nodes);
        status.insert("a".to_string(), NodeStatus::Down);
        status.insert("b".to_string(), NodeStatus::Degraded);

        let m = compute_metrics(&nodes, &status);
        // healthy weight = 0 + 50 + 200 out of 400
        assert_eq!(m.percent_operational, 63);
        assert_eq!(m.affected_users, 150);
        assert_eq!(m.financial_impact, 13);
        assert_eq!(
            (m.services_down, m.services_degraded, m.services_healthy),
            (1, 1, 1)
        );
    }

    #[test]
    fn test_dns_collapse_metrics() {
        let nodes = default_nodes();
        let waves = propagate_failure(&nodes, &default_edges(), &["dns-root"]);
        let status = apply_waves(&baseline_status(&nodes), &waves);
        let m = compute_metrics(&nodes, &status);

        // down: dns-root, cloudflare-dns, google-dns, bank-app, gov-services,
        //       cloudflare-cdn, gmail
        // degraded: stripe, gcp, netflix, shopify, twitter
        assert_eq!(m.services_down, 7);
        assert_eq!(m.services_degraded, 5);
        assert_eq!(m.services_healthy, 5);
        assert!(m.percent_operational < 50);
        // 265 down + 46.5 degraded
        assert_eq!(m.financial_impact, 312);
    }

    #[test]
    fn test_comparison_trades_outages_for_degradation() {
        let nodes = default_nodes();
        let waves = propagate_failure(&nodes, &default_edges(), &["aws"]);
        let actual = compute_metrics(&nodes, &apply_waves(&baseline_status(&nodes), &waves));
        let resilient = comparison_metrics(&["aws"]);

        // Failover keeps services up, but the aws -> gmail edge degrades Gmail,
        // so more users see partial service.
        assert_eq!(
            actual,
            Metrics {
                percent_operational: 86,
                affected_users: 1750,
                financial_impact: 220,
                services_down: 5,
                services_degraded: 1,
                services_healthy: 11,
            }
        );
        assert_eq!(
            resilient,
            Metrics {
                percent_operational: 80,
                affected_users: 2400,
                financial_impact: 113,
                services_down: 1,
                services_degraded: 6,
                services_healthy: 10,
            }
        );
        assert!(resilient.services_down < actual.services_down);
        assert!(resilient.financial_impact < actual.financial_impact);
    }
}
