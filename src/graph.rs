//! Internet dependency graph: node/edge types, the default dataset,
//! and the decentralization transform.
//!
//! Edges point from an upstream dependency (`source`) to the downstream
//! dependent (`target`). Graph values are never mutated in place; every
//! transform returns fresh collections.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Id prefix reserved for nodes synthesized by the site analyzer.
pub const CUSTOM_NODE_PREFIX: &str = "custom-";

/// Id of the end-user sink every service eventually feeds.
pub const USERS_NODE_ID: &str = "users";

/// Health of a single node.
///
/// Ordering follows severity, so `Healthy < Degraded < Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Healthy,
    Degraded,
    Down,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Healthy => "healthy",
            NodeStatus::Degraded => "degraded",
            NodeStatus::Down => "down",
        }
    }
}

impl Default for NodeStatus {
    fn default() -> Self {
        NodeStatus::Healthy
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infrastructure category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfraType {
    Dns,
    Cdn,
    Cloud,
    Saas,
    Finance,
    Social,
    Government,
    /// End-user sink, excluded from service-health weighting
    User,
}

impl InfraType {
    /// Human-readable description used in narrative lines.
    pub fn description(&self) -> &'static str {
        match self {
            InfraType::Dns => "DNS provider",
            InfraType::Cdn => "CDN service",
            InfraType::Cloud => "cloud provider",
            InfraType::Saas => "SaaS platform",
            InfraType::Finance => "financial service",
            InfraType::Social => "social media platform",
            InfraType::Government => "government service",
            InfraType::User => "end user segment",
        }
    }
}

/// A named infrastructure or service entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub infra_type: InfraType,
    pub emoji: String,
    pub status: NodeStatus,
    /// Millions of users affected when the node fails
    pub user_count: f64,
    /// Millions USD lost per hour of outage
    pub financial_impact_per_hour: f64,
}

impl InfraNode {
    pub fn new(
        id: &str,
        label: &str,
        infra_type: InfraType,
        emoji: &str,
        user_count: f64,
        financial_impact_per_hour: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            infra_type,
            emoji: emoji.to_string(),
            status: NodeStatus::Healthy,
            user_count,
            financial_impact_per_hour,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.id.starts_with(CUSTOM_NODE_PREFIX)
    }
}

/// A directed dependency from `source` (upstream) to `target` (downstream).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InfraEdge {
    pub source: String,
    pub target: String,
    pub critical: bool,
}

impl InfraEdge {
    pub fn new(source: &str, target: &str, critical: bool) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            critical,
        }
    }

    fn touches_custom_node(&self) -> bool {
        self.source.starts_with(CUSTOM_NODE_PREFIX) || self.target.starts_with(CUSTOM_NODE_PREFIX)
    }
}

/// Status snapshot keyed by node id.
pub type StatusMap = HashMap<String, NodeStatus>;

/// Look up a snapshot entry; absent ids read as healthy.
pub fn status_of(status: &StatusMap, id: &str) -> NodeStatus {
    status.get(id).copied().unwrap_or_default()
}

/// All-healthy snapshot covering every node.
pub fn baseline_status(nodes: &[InfraNode]) -> StatusMap {
    nodes
        .iter()
        .map(|n| (n.id.clone(), NodeStatus::Healthy))
        .collect()
}

/// Find a node by id.
pub fn find_node<'a>(nodes: &'a [InfraNode], id: &str) -> Option<&'a InfraNode> {
    nodes.iter().find(|n| n.id == id)
}

/// Display label for an id, falling back to the id itself.
pub fn label_of<'a>(nodes: &'a [InfraNode], id: &'a str) -> &'a str {
    find_node(nodes, id).map(|n| n.label.as_str()).unwrap_or(id)
}

/// Nodes plus edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InternetGraph {
    pub nodes: Vec<InfraNode>,
    pub edges: Vec<InfraEdge>,
}

impl InternetGraph {
    /// The built-in infrastructure dataset.
    pub fn default_graph() -> Self {
        Self {
            nodes: default_nodes(),
            edges: default_edges(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&InfraNode> {
        find_node(&self.nodes, id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Copy of the graph with every site-analyzer node and its edges removed.
    pub fn without_custom_nodes(&self) -> Self {
        Self {
            nodes: self
                .nodes
                .iter()
                .filter(|n| !n.is_custom())
                .cloned()
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|e| !e.touches_custom_node())
                .cloned()
                .collect(),
        }
    }

    /// Copy of the graph with `level` decentralization applied.
    pub fn decentralized(&self, level: u8) -> Self {
        let (nodes, edges) = apply_decentralization(&self.nodes, &self.edges, level);
        Self { nodes, edges }
    }
}

// =============================================================================
// Default dataset
// =============================================================================

/// The 18 built-in infrastructure nodes.
pub fn default_nodes() -> Vec<InfraNode> {
    use InfraType::*;
    vec![
        // DNS layer
        InfraNode::new("dns-root", "Root DNS", Dns, "🌐", 4500.0, 0.0),
        InfraNode::new("cloudflare-dns", "Cloudflare DNS", Dns, "🌐", 500.0, 0.0),
        InfraNode::new("google-dns", "Google DNS", Dns, "🌐", 500.0, 0.0),
        // Cloud layer
        InfraNode::new("aws", "AWS", Cloud, "☁️", 1000.0, 0.0),
        InfraNode::new("gcp", "Google Cloud", Cloud, "☁️", 400.0, 0.0),
        InfraNode::new("azure", "Azure", Cloud, "☁️", 300.0, 0.0),
        // CDN layer
        InfraNode::new("cloudflare-cdn", "Cloudflare CDN", Cdn, "📡", 800.0, 0.0),
        InfraNode::new("fastly-cdn", "Fastly CDN", Cdn, "📡", 300.0, 0.0),
        InfraNode::new("akamai-cdn", "Akamai CDN", Cdn, "📡", 400.0, 0.0),
        // Applications
        InfraNode::new("netflix", "Netflix", Saas, "🎬", 250.0, 30.0),
        InfraNode::new("shopify", "Shopify", Saas, "🛒", 50.0, 20.0),
        InfraNode::new("gmail", "Gmail", Saas, "📧", 1800.0, 15.0),
        InfraNode::new("github", "GitHub", Saas, "💻", 100.0, 10.0),
        InfraNode::new("twitter", "X / Twitter", Social, "🐦", 400.0, 5.0),
        InfraNode::new("stripe", "Stripe", Finance, "💳", 100.0, 100.0),
        InfraNode::new("bank-app", "Banking Services", Finance, "🏦", 500.0, 200.0),
        InfraNode::new(
            "gov-services",
            "Gov Services",
            Government,
            "🏛️",
            300.0,
            50.0,
        ),
        // Sink
        InfraNode::new(USERS_NODE_ID, "End Users", User, "👤", 4500.0, 0.0),
    ]
}

/// The 31 built-in dependency edges, in scan order.
pub fn default_edges() -> Vec<InfraEdge> {
    let e = InfraEdge::new;
    vec![
        // Root DNS feeds the resolvers
        e("dns-root", "cloudflare-dns", true),
        e("dns-root", "google-dns", true),
        // Resolvers feed CDN and cloud
        e("cloudflare-dns", "cloudflare-cdn", true),
        e("google-dns", "gcp", false),
        // Cloud hosting
        e("aws", "netflix", true),
        e("aws", "shopify", true),
        e("aws", "stripe", true),
        e("aws", "github", true),
        e("aws", "bank-app", false),
        e("gcp", "gmail", true),
        e("azure", "gov-services", true),
        e("azure", "bank-app", true),
        // CDN delivery
        e("cloudflare-cdn", "netflix", false),
        e("cloudflare-cdn", "twitter", false),
        e("cloudflare-cdn", "shopify", false),
        e("fastly-cdn", "twitter", true),
        e("fastly-cdn", "github", false),
        e("akamai-cdn", "bank-app", false),
        e("akamai-cdn", "gov-services", false),
        // Direct DNS dependencies
        e("dns-root", "bank-app", true),
        e("dns-root", "gov-services", true),
        e("dns-root", "stripe", false),
        e("google-dns", "gmail", true),
        // Services feed users
        e("netflix", USERS_NODE_ID, false),
        e("twitter", USERS_NODE_ID, false),
        e("gmail", USERS_NODE_ID, false),
        e("github", USERS_NODE_ID, false),
        e("shopify", USERS_NODE_ID, false),
        e("stripe", USERS_NODE_ID, false),
        e("bank-app", USERS_NODE_ID, true),
        e("gov-services", USERS_NODE_ID, false),
    ]
}

// =============================================================================
// Decentralization
// =============================================================================

/// Failover edges added at level >= 30.
const TIER_ONE_FAILOVERS: &[(&str, &str)] = &[("gcp", "netflix"), ("azure", "shopify")];

/// Failover edges added at level >= 50.
const TIER_TWO_FAILOVERS: &[(&str, &str)] = &[
    ("google-dns", "bank-app"),
    ("azure", "github"),
    ("gcp", "stripe"),
];

/// Failover edges added at level >= 70, after criticality is demoted.
const TIER_THREE_FAILOVERS: &[(&str, &str)] = &[("aws", "gmail"), ("google-dns", "gov-services")];

/// Model a more resilient topology by adding redundant providers.
///
/// - `level <= 10`: unchanged copy
/// - `level >= 30`: two cloud failovers
/// - `level >= 50`: three more DNS/cloud failovers
/// - `level >= 70`: critical edges into targets that now have more than one
///   incoming edge become non-critical, then two more failovers are added
///
/// Duplicate `(source, target)` pairs are dropped, keeping the first. The
/// result depends only on the inputs, so callers always derive it from the
/// untouched default graph.
pub fn apply_decentralization(
    nodes: &[InfraNode],
    edges: &[InfraEdge],
    level: u8,
) -> (Vec<InfraNode>, Vec<InfraEdge>) {
    if level <= 10 {
        return (nodes.to_vec(), edges.to_vec());
    }

    let mut existing: Vec<InfraEdge> = edges.to_vec();
    let mut extra: Vec<InfraEdge> = Vec::new();

    if level >= 30 {
        push_failovers(TIER_ONE_FAILOVERS, &mut extra);
    }
    if level >= 50 {
        push_failovers(TIER_TWO_FAILOVERS, &mut extra);
    }
    if level >= 70 {
        let mut incoming: HashMap<&str, usize> = HashMap::new();
        for e in existing.iter().chain(extra.iter()) {
            *incoming.entry(e.target.as_str()).or_default() += 1;
        }
        let redundant: HashSet<String> = incoming
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(target, _)| target.to_string())
            .collect();

        for e in existing.iter_mut().filter(|e| e.critical) {
            if redundant.contains(&e.target) {
                e.critical = false;
            }
        }
        push_failovers(TIER_THREE_FAILOVERS, &mut extra);
    }

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let deduped = existing
        .into_iter()
        .chain(extra)
        .filter(|e| seen.insert((e.source.clone(), e.target.clone())))
        .collect();

    (nodes.to_vec(), deduped)
}

fn push_failovers(pairs: &[(&str, &str)], out: &mut Vec<InfraEdge>) {
    out.extend(pairs.iter().map(|(s, t)| InfraEdge::new(s, t, false)));
}
