//! Cascading failure propagation engine.
//!
//! Given a graph and a kill set, compute the ordered list of waves in which
//! failure spreads to dependents. The engine never touches the caller's
//! snapshot: it works on a private copy and returns a description of the
//! changes, which the orchestrator applies at its own pace.
//!
//! # Scan-order contract
//!
//! Within a round, nodes are visited in node declaration order, and each
//! node's incoming edges are inspected in edge declaration order. The first
//! critical edge whose source is down decides both the `Down` status and the
//! attached reason. Every round reads the snapshot as it stood when the round
//! began, so changes within a round never feed each other.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::graph::{find_node, label_of, status_of, InfraEdge, InfraNode, NodeStatus, StatusMap};

/// A single node's transition within a wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub node_id: String,
    pub new_status: NodeStatus,
    pub reason: String,
}

/// Status changes applied together in one propagation round.
pub type Wave = Vec<StatusChange>;

/// Why the wave-0 nodes went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KillCause {
    /// Part of a scenario started from a clean baseline
    Direct,
    /// Killed by the operator on top of a running simulation
    Manual,
}

impl KillCause {
    fn reason(&self, nodes: &[InfraNode], id: &str) -> String {
        match self {
            KillCause::Direct => "Directly impacted: service offline.".to_string(),
            KillCause::Manual => format!("Manually killed: {} taken offline.", label_of(nodes, id)),
        }
    }
}

/// Propagate failure of `kill_ids` from an all-healthy baseline.
///
/// Returns no waves when nothing new was killed.
pub fn propagate_failure<S: AsRef<str>>(
    nodes: &[InfraNode],
    edges: &[InfraEdge],
    kill_ids: &[S],
) -> Vec<Wave> {
    let baseline: StatusMap = nodes
        .iter()
        .map(|n| (n.id.clone(), NodeStatus::Healthy))
        .collect();
    run(nodes, edges, baseline, kill_ids, KillCause::Direct)
}

/// Propagate failure of `new_kill_ids` on top of an existing snapshot.
///
/// `current` is read, never modified. Ids missing from it read as healthy.
pub fn propagate_from_state<S: AsRef<str>>(
    nodes: &[InfraNode],
    edges: &[InfraEdge],
    current: &StatusMap,
    new_kill_ids: &[S],
) -> Vec<Wave> {
    run(
        nodes,
        edges,
        current.clone(),
        new_kill_ids,
        KillCause::Manual,
    )
}

/// Apply one wave to a snapshot.
pub fn apply_wave(status: &mut StatusMap, wave: &[StatusChange]) {
    for change in wave {
        status.insert(change.node_id.clone(), change.new_status);
    }
}

/// Fold every wave into a copy of `status`.
pub fn apply_waves(status: &StatusMap, waves: &[Wave]) -> StatusMap {
    let mut next = status.clone();
    for wave in waves {
        apply_wave(&mut next, wave);
    }
    next
}

/// Incoming edges per target, in edge declaration order.
struct IncomingIndex<'a> {
    by_target: HashMap<&'a str, Vec<&'a InfraEdge>>,
}

impl<'a> IncomingIndex<'a> {
    fn build(edges: &'a [InfraEdge]) -> Self {
        let mut by_target: HashMap<&'a str, Vec<&'a InfraEdge>> = HashMap::new();
        for edge in edges {
            by_target
                .entry(edge.target.as_str())
                .or_default()
                .push(edge);
        }
        Self { by_target }
    }

    fn incoming(&self, target: &str) -> &[&'a InfraEdge] {
        self.by_target.get(target).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn run<S: AsRef<str>>(
    nodes: &[InfraNode],
    edges: &[InfraEdge],
    mut status: StatusMap,
    kill_ids: &[S],
    cause: KillCause,
) -> Vec<Wave> {
    let mut waves: Vec<Wave> = Vec::new();

    let mut requested: HashSet<&str> = HashSet::new();
    let wave0: Wave = kill_ids
        .iter()
        .map(|id| AsRef::<str>::as_ref(id))
        .filter(|id| requested.insert(*id))
        .filter(|id| find_node(nodes, id).is_some())
        .filter(|id| status_of(&status, id) != NodeStatus::Down)
        .map(|id| StatusChange {
            node_id: id.to_string(),
            new_status: NodeStatus::Down,
            reason: cause.reason(nodes, id),
        })
        .collect();

    if wave0.is_empty() {
        debug!("kill set produced no changes");
        return waves;
    }
    apply_wave(&mut status, &wave0);
    waves.push(wave0);

    let index = IncomingIndex::build(edges);
    loop {
        let wave: Wave = nodes
            .iter()
            .filter_map(|node| assess(node, &index, &status, nodes))
            .collect();

        if wave.is_empty() {
            break;
        }
        debug!(round = waves.len(), changes = wave.len(), "cascade round");
        apply_wave(&mut status, &wave);
        waves.push(wave);
    }

    waves
}

/// Decide the next status of one node from its incoming edges.
fn assess(
    node: &InfraNode,
    index: &IncomingIndex<'_>,
    status: &StatusMap,
    nodes: &[InfraNode],
) -> Option<StatusChange> {
    let current = status_of(status, &node.id);
    if current == NodeStatus::Down {
        return None;
    }

    let change = |new_status, reason| StatusChange {
        node_id: node.id.clone(),
        new_status,
        reason,
    };

    let mut degraded_reason: Option<String> = None;
    for edge in index.incoming(&node.id) {
        let source = label_of(nodes, &edge.source);
        match (status.get(edge.source.as_str()), edge.critical) {
            (Some(NodeStatus::Down), true) => {
                return Some(change(
                    NodeStatus::Down,
                    format!("Critical dependency {} is down.", source),
                ));
            }
            (Some(NodeStatus::Down), false) => {
                degraded_reason = Some(format!("Non-critical dependency {} is down.", source));
            }
            (Some(NodeStatus::Degraded), true) => {
                degraded_reason = Some(format!("Critical dependency {} is degraded.", source));
            }
            _ => {}
        }
    }

    match degraded_reason {
        Some(reason) if current == NodeStatus::Healthy => {
            Some(change(NodeStatus::Degraded, reason))
        }
        _ => None,
    }
}
