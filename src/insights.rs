//! Structural risk indicators derived from graph topology.
//!
//! Insights depend only on nodes and edges, never on run-time status, so
//! they can be computed once per graph.

use serde::{Deserialize, Serialize};

use crate::graph::{label_of, InfraEdge, InfraNode, InfraType};

/// Out-degree at which a provider counts as a single point of failure.
const SPOF_MIN_DEGREE: usize = 3;

/// Insight severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Glyph shown in the final analysis report.
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::High => "🟠",
            _ => "🟡",
        }
    }
}

/// A labelled risk indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub label: String,
    pub value: String,
    pub severity: Severity,
}

impl Insight {
    fn new(label: &str, value: String, severity: Severity) -> Self {
        Self {
            label: label.to_string(),
            value,
            severity,
        }
    }
}

/// Outgoing edge counts per source, in first-seen edge order.
fn out_degrees<'a>(edges: impl IntoIterator<Item = &'a InfraEdge>) -> Vec<(&'a str, usize)> {
    let mut degrees: Vec<(&'a str, usize)> = Vec::new();
    for edge in edges {
        match degrees.iter_mut().find(|(id, _)| *id == edge.source) {
            Some((_, count)) => *count += 1,
            None => degrees.push((edge.source.as_str(), 1)),
        }
    }
    degrees
}

/// Highest entry; ties go to the earliest.
fn top<'a>(degrees: &[(&'a str, usize)]) -> Option<(&'a str, usize)> {
    let mut best: Option<(&'a str, usize)> = None;
    for &(id, count) in degrees {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((id, count));
        }
    }
    best
}

fn ids_of_type(nodes: &[InfraNode], infra_type: InfraType) -> Vec<&str> {
    nodes
        .iter()
        .filter(|n| n.infra_type == infra_type)
        .map(|n| n.id.as_str())
        .collect()
}

fn edges_from<'a>(
    edges: &'a [InfraEdge],
    sources: &'a [&str],
) -> impl Iterator<Item = &'a InfraEdge> {
    edges
        .iter()
        .filter(move |e| sources.contains(&e.source.as_str()))
}

/// Compute the fixed set of topology insights, in display order:
/// most critical node, DNS centralization, cloud concentration, CDN
/// density, then single points of failure (omitted when there are none).
pub fn compute_insights(nodes: &[InfraNode], edges: &[InfraEdge]) -> Vec<Insight> {
    let mut insights = Vec::with_capacity(5);
    let degrees = out_degrees(edges);

    let (hub, hub_degree) = top(&degrees).unwrap_or(("", 0));
    insights.push(Insight::new(
        "Most critical node",
        format!("{} ({} dependencies)", label_of(nodes, hub), hub_degree),
        match hub_degree {
            d if d > 5 => Severity::Critical,
            d if d > 3 => Severity::High,
            _ => Severity::Medium,
        },
    ));

    let dns = ids_of_type(nodes, InfraType::Dns);
    let dns_deps = edges_from(edges, &dns).count();
    insights.push(Insight::new(
        "DNS centralization risk",
        format!(
            "{} services depend on {} DNS providers",
            dns_deps,
            dns.len()
        ),
        if dns.len() <= 2 {
            Severity::Critical
        } else {
            Severity::Medium
        },
    ));

    let clouds = ids_of_type(nodes, InfraType::Cloud);
    let cloud_degrees = out_degrees(edges_from(edges, &clouds));
    let (top_cloud, top_cloud_deps) = top(&cloud_degrees).unwrap_or(("", 0));
    insights.push(Insight::new(
        "Cloud concentration",
        format!(
            "{} hosts {} services",
            label_of(nodes, top_cloud),
            top_cloud_deps
        ),
        if top_cloud_deps >= 4 {
            Severity::High
        } else {
            Severity::Medium
        },
    ));

    let cdns = ids_of_type(nodes, InfraType::Cdn);
    let cdn_deps = edges_from(edges, &cdns).count();
    insights.push(Insight::new(
        "CDN dependency density",
        format!("{} services rely on CDN layer", cdn_deps),
        if cdn_deps > 5 {
            Severity::High
        } else {
            Severity::Medium
        },
    ));

    let spofs: Vec<&str> = degrees
        .iter()
        .filter(|(_, degree)| *degree >= SPOF_MIN_DEGREE)
        .map(|&(id, _)| label_of(nodes, id))
        .collect();
    if !spofs.is_empty() {
        insights.push(Insight::new(
            "Single points of failure",
            spofs.join(", "),
            Severity::Critical,
        ));
    }

    insights
}
