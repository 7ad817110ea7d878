//! Stateful simulation session.
//!
//! [`Simulation`] owns everything a frontend shows: the live graph, the
//! status snapshot, the narrative log and the metrics. A cascade is computed
//! up front and then applied one wave at a time through [`Simulation::advance`],
//! so callers decide the pacing.
//!
//! Runs are tagged with a generation number that changes whenever a run is
//! started or abandoned. Async playback compares generations to notice that
//! the run it was driving is gone.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cascade_err;
use crate::config::StudioConfig;
use crate::error::Result;
use crate::graph::{
    baseline_status, status_of, InfraEdge, InfraNode, InternetGraph, NodeStatus, StatusMap,
};
use crate::insights::{compute_insights, Insight};
use crate::metrics::{comparison_metrics, compute_metrics, Metrics};
use crate::narrative::{
    generate_final_analysis_with_clock, generate_narrative_for_wave_with_clock,
    generate_site_narrative, manual_kill_banner, scenario_banner, NarrativeClock, NarrativeMessage,
};
use crate::propagation::{apply_wave, propagate_failure, propagate_from_state, Wave};
use crate::scenario::ScenarioId;
use crate::site::{analyze_site, SiteAnalysis};

/// Highest accepted decentralization level.
pub const MAX_DECENTRALIZATION: u32 = 100;

/// What started a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum RunTrigger {
    Scenario(ScenarioId),
    ManualKill(String),
}

/// Pending waves of an in-progress run.
#[derive(Debug, Clone)]
struct Run {
    trigger: RunTrigger,
    waves: Vec<Wave>,
    cursor: usize,
}

/// Result of applying one wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveUpdate {
    pub generation: u64,
    /// Zero-based index of the applied wave
    pub index: usize,
    pub total: usize,
    pub changes: Wave,
    pub metrics: Metrics,
    /// Narrative for this wave, plus the final report when `complete`
    pub messages: Vec<NarrativeMessage>,
    pub complete: bool,
}

/// Serializable view of the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSnapshot {
    /// Nodes with their current status filled in
    pub nodes: Vec<InfraNode>,
    pub edges: Vec<InfraEdge>,
    pub status_map: StatusMap,
    pub metrics: Metrics,
    pub comparison_metrics: Option<Metrics>,
    pub insights: Vec<Insight>,
    pub narrative_log: Vec<NarrativeMessage>,
    pub is_running: bool,
    pub current_wave: usize,
    pub total_waves: usize,
    pub decentralization: u8,
    pub active_scenario: Option<ScenarioId>,
    pub analyzed_site: Option<SiteAnalysis>,
    pub killed_nodes: Vec<String>,
    pub generation: u64,
}

/// One simulation session.
#[derive(Debug, Clone)]
pub struct Simulation {
    level: u8,
    graph: InternetGraph,
    status: StatusMap,
    killed: Vec<String>,
    log: Vec<NarrativeMessage>,
    active_scenario: Option<ScenarioId>,
    site: Option<SiteAnalysis>,
    metrics: Metrics,
    insights: Vec<Insight>,
    comparison: Option<Metrics>,
    run: Option<Run>,
    current_wave: usize,
    total_waves: usize,
    generation: u64,
    narrative_seed: Option<u64>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// Session over the default graph at level 0.
    pub fn new() -> Self {
        let graph = InternetGraph::default_graph();
        let status = baseline_status(&graph.nodes);
        let metrics = compute_metrics(&graph.nodes, &status);
        Self {
            level: 0,
            graph,
            status,
            killed: Vec::new(),
            log: Vec::new(),
            active_scenario: None,
            site: None,
            metrics,
            insights: Vec::new(),
            comparison: None,
            run: None,
            current_wave: 0,
            total_waves: 0,
            generation: 0,
            narrative_seed: None,
        }
    }

    /// Session configured from studio settings.
    pub fn from_config(config: &StudioConfig) -> Result<Self> {
        let mut sim = Self::new().with_narrative_seed(config.narrative_seed);
        sim.set_decentralization(config.decentralization)?;
        Ok(sim)
    }

    /// Fix the narrative jitter so logs are reproducible.
    pub fn with_narrative_seed(mut self, seed: Option<u64>) -> Self {
        self.narrative_seed = seed;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn decentralization(&self) -> u8 {
        self.level
    }

    pub fn graph(&self) -> &InternetGraph {
        &self.graph
    }

    pub fn status(&self) -> &StatusMap {
        &self.status
    }

    pub fn status_of(&self, id: &str) -> NodeStatus {
        status_of(&self.status, id)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn comparison_metrics(&self) -> Option<&Metrics> {
        self.comparison.as_ref()
    }

    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    pub fn narrative_log(&self) -> &[NarrativeMessage] {
        &self.log
    }

    pub fn analyzed_site(&self) -> Option<&SiteAnalysis> {
        self.site.as_ref()
    }

    pub fn killed_nodes(&self) -> &[String] {
        &self.killed
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Changes whenever a run starts or is abandoned.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Trigger of the in-progress run, if any.
    pub fn running(&self) -> Option<&RunTrigger> {
        self.run.as_ref().map(|r| &r.trigger)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Set the decentralization dial and rebuild the live graph from the
    /// default dataset. An analysed site stays merged. The status snapshot
    /// is kept.
    pub fn set_decentralization(&mut self, level: u32) -> Result<()> {
        if level > MAX_DECENTRALIZATION {
            return Err(cascade_err!(
                DecentralizationOutOfRange,
                "Decentralization level {} is out of range (0-{})",
                level,
                MAX_DECENTRALIZATION
            ));
        }
        self.ensure_idle("change decentralization")?;

        self.level = level as u8;
        self.rebuild_graph();
        self.metrics = compute_metrics(&self.graph.nodes, &self.status);
        info!(
            level,
            edges = self.graph.edges.len(),
            "Decentralization updated"
        );
        Ok(())
    }

    /// Start a preset scenario from an all-healthy snapshot.
    ///
    /// Any run in progress is abandoned. The narrative log restarts with the
    /// scenario banner.
    pub fn run_scenario(&mut self, id: ScenarioId) -> usize {
        let scenario = id.scenario();
        let waves = propagate_failure(&self.graph.nodes, &self.graph.edges, scenario.kill_nodes);

        info!(scenario = %id, waves = waves.len(), "Running scenario");

        self.status = baseline_status(&self.graph.nodes);
        self.metrics = compute_metrics(&self.graph.nodes, &self.status);
        self.insights.clear();
        self.comparison = None;
        self.killed = scenario.kill_ids();
        self.active_scenario = Some(id);
        self.log = scenario_banner(&mut self.clock(), &scenario);

        self.start_run(RunTrigger::Scenario(id), waves)
    }

    /// Take one more node offline, cascading from the current snapshot.
    ///
    /// Returns the number of waves queued. Unknown and already-down ids
    /// queue nothing. Rejected while a run is in progress.
    pub fn kill_node(&mut self, id: &str) -> Result<usize> {
        self.ensure_idle("kill a node")?;

        let Some(node) = self.graph.node(id).cloned() else {
            debug!(id, "Ignoring kill of unknown node");
            return Ok(0);
        };
        if self.status_of(id) == NodeStatus::Down {
            debug!(id, "Ignoring kill of node that is already down");
            return Ok(0);
        }

        self.killed.push(node.id.clone());
        self.comparison = None;

        let waves = propagate_from_state(&self.graph.nodes, &self.graph.edges, &self.status, &[id]);
        if waves.is_empty() {
            return Ok(0);
        }

        info!(node = %node.id, waves = waves.len(), "Manual kill");

        self.active_scenario = None;
        let banner = manual_kill_banner(&mut self.clock(), &node);
        self.log.extend(banner);

        Ok(self.start_run(RunTrigger::ManualKill(node.id), waves))
    }

    /// Apply the next pending wave.
    ///
    /// After the last wave the run completes: insights, the final report and
    /// the comparison metrics are computed. Returns `None` when idle.
    pub fn advance(&mut self) -> Option<WaveUpdate> {
        let run = self.run.as_mut()?;
        let index = run.cursor;
        let total = run.waves.len();
        let changes = run.waves.get(index).cloned().unwrap_or_default();
        run.cursor += 1;

        apply_wave(&mut self.status, &changes);
        self.metrics = compute_metrics(&self.graph.nodes, &self.status);
        self.current_wave = index + 1;

        debug!(wave = index, changes = changes.len(), "Applied wave");

        let mut messages = generate_narrative_for_wave_with_clock(
            &mut self.clock().at_wave(index),
            index,
            &changes,
            &self.graph.nodes,
            total,
        );

        let complete = index + 1 >= total;
        if complete {
            messages.extend(self.complete_run());
        }
        self.log.extend(messages.iter().cloned());

        Some(WaveUpdate {
            generation: self.generation,
            index,
            total,
            changes,
            metrics: self.metrics,
            messages,
            complete,
        })
    }

    /// Apply every pending wave.
    pub fn finish(&mut self) -> Vec<WaveUpdate> {
        std::iter::from_fn(|| self.advance()).collect()
    }

    /// Analyse a site and merge it into the live graph, replacing any
    /// previously analysed site. The snapshot restarts all-healthy.
    pub fn analyze_site_url(&mut self, url: &str) -> Result<SiteAnalysis> {
        self.ensure_idle("analyze a site")?;

        let analysis = analyze_site(url);
        info!(domain = %analysis.domain, deps = analysis.dependency_ids.len(), "Analysed site");

        self.site = Some(analysis.clone());
        self.rebuild_graph();
        self.status = baseline_status(&self.graph.nodes);
        self.metrics = compute_metrics(&self.graph.nodes, &self.status);
        self.killed.clear();

        let narrative = generate_site_narrative(&mut self.clock(), &analysis, &self.graph.nodes);
        self.log.extend(narrative);

        Ok(analysis)
    }

    /// Abandon any run and restore the untouched decentralized graph.
    pub fn reset(&mut self) {
        info!("Resetting simulation");

        self.run = None;
        self.generation += 1;
        self.site = None;
        self.rebuild_graph();
        self.status = baseline_status(&self.graph.nodes);
        self.metrics = compute_metrics(&self.graph.nodes, &self.status);
        self.comparison = None;
        self.insights.clear();
        self.log.clear();
        self.killed.clear();
        self.active_scenario = None;
        self.current_wave = 0;
        self.total_waves = 0;
    }

    /// Everything a frontend needs to render the session.
    pub fn snapshot(&self) -> SimulationSnapshot {
        let nodes = self
            .graph
            .nodes
            .iter()
            .map(|n| InfraNode {
                status: self.status_of(&n.id),
                ..n.clone()
            })
            .collect();

        SimulationSnapshot {
            nodes,
            edges: self.graph.edges.clone(),
            status_map: self.status.clone(),
            metrics: self.metrics,
            comparison_metrics: self.comparison,
            insights: self.insights.clone(),
            narrative_log: self.log.clone(),
            is_running: self.is_running(),
            current_wave: self.current_wave,
            total_waves: self.total_waves,
            decentralization: self.level,
            active_scenario: self.active_scenario,
            analyzed_site: self.site.clone(),
            killed_nodes: self.killed.clone(),
            generation: self.generation,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_idle(&self, action: &str) -> Result<()> {
        match &self.run {
            Some(run) => Err(cascade_err!(
                SimulationBusy,
                "Cannot {} while a cascade is running ({} of {} waves applied)",
                action,
                run.cursor,
                run.waves.len()
            )),
            None => Ok(()),
        }
    }

    fn clock(&self) -> NarrativeClock {
        NarrativeClock::starting_now(self.narrative_seed)
    }

    /// Decentralized default graph plus the analysed site, if any.
    fn rebuild_graph(&mut self) {
        let mut graph = InternetGraph::default_graph().decentralized(self.level);
        if let Some(site) = &self.site {
            graph.nodes.push(site.node.clone());
            graph.edges.extend(site.edges.iter().cloned());
        }
        self.graph = graph;
    }

    fn start_run(&mut self, trigger: RunTrigger, waves: Vec<Wave>) -> usize {
        let total = waves.len();
        self.generation += 1;
        self.current_wave = 0;
        self.total_waves = total;

        if total == 0 {
            self.run = None;
            let report = self.complete_run();
            self.log.extend(report);
        } else {
            self.run = Some(Run {
                trigger,
                waves,
                cursor: 0,
            });
        }
        total
    }

    fn complete_run(&mut self) -> Vec<NarrativeMessage> {
        self.run = None;
        self.insights = compute_insights(&self.graph.nodes, &self.graph.edges);
        self.comparison = Some(comparison_metrics(&self.killed));

        info!(
            operational = self.metrics.percent_operational,
            down = self.metrics.services_down,
            "Cascade complete"
        );

        generate_final_analysis_with_clock(&mut self.clock(), &self.metrics, &self.insights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::narrative::NarrativeKind;

    fn sim() -> Simulation {
        Simulation::new().with_narrative_seed(Some(7))
    }

    #[test]
    fn test_new_session_is_healthy() {
        let s = sim();
        assert_eq!(s.metrics().percent_operational, 100);
        assert_eq!(s.graph().edges.len(), 31);
        assert!(!s.is_running());
        assert!(s.narrative_log().is_empty());
    }

    #[test]
    fn test_run_scenario_plays_waves() {
        let mut s = sim();
        let total = s.run_scenario(ScenarioId::DnsCollapse);
        assert_eq!(total, 4);
        assert!(s.is_running());
        assert_eq!(
            s.running(),
            Some(&RunTrigger::Scenario(ScenarioId::DnsCollapse))
        );
        assert_eq!(s.narrative_log()[0].text, "━━━ SCENARIO: DNS COLLAPSE ━━━");

        let first = s.advance().unwrap();
        assert_eq!(first.index, 0);
        assert!(!first.complete);
        assert_eq!(s.status_of("dns-root"), NodeStatus::Down);
        assert_eq!(s.status_of("bank-app"), NodeStatus::Healthy);

        let rest = s.finish();
        assert_eq!(rest.len(), 3);
        assert!(rest.last().unwrap().complete);
        assert!(!s.is_running());
        assert!(s.advance().is_none());

        assert_eq!(s.status_of("bank-app"), NodeStatus::Down);
        assert_eq!(s.status_of("stripe"), NodeStatus::Degraded);
        assert_eq!(s.metrics().services_down, 7);
        assert!(s.comparison_metrics().is_some());
        assert!(!s.insights().is_empty());
        assert_eq!(
            s.narrative_log().last().map(|m| m.kind),
            Some(NarrativeKind::Analysis)
        );
    }

    #[test]
    fn test_scenario_restarts_running_scenario() {
        let mut s = sim();
        s.run_scenario(ScenarioId::AwsOutage);
        s.advance();
        let generation = s.generation();

        s.run_scenario(ScenarioId::CdnOutage);
        assert!(s.generation() > generation);
        assert_eq!(s.status_of("aws"), NodeStatus::Healthy);
        assert_eq!(s.killed_nodes().len(), 3);
    }

    #[test]
    fn test_kill_node_layers_on_current_state() {
        let mut s = sim();
        s.run_scenario(ScenarioId::AwsOutage);
        s.finish();
        assert_eq!(s.status_of("netflix"), NodeStatus::Down);

        let waves = s.kill_node("azure").unwrap();
        assert!(waves > 0);
        let banner = &s.narrative_log()[s.narrative_log().len() - 2..];
        assert_eq!(banner[0].text, "━━━ MANUAL KILL: AZURE ━━━");

        s.finish();
        assert_eq!(s.status_of("azure"), NodeStatus::Down);
        assert_eq!(s.status_of("gov-services"), NodeStatus::Down);
        // earlier damage survives
        assert_eq!(s.status_of("netflix"), NodeStatus::Down);
        assert_eq!(s.killed_nodes(), &["aws".to_string(), "azure".to_string()]);
    }

    #[test]
    fn test_kill_node_rejected_while_running() {
        let mut s = sim();
        s.run_scenario(ScenarioId::DnsCollapse);
        let err = s.kill_node("aws").unwrap_err();
        assert!(err.is(ErrorCode::SimulationBusy));
    }

    #[test]
    fn test_kill_unknown_or_down_is_noop() {
        let mut s = sim();
        assert_eq!(s.kill_node("nope").unwrap(), 0);
        assert!(s.killed_nodes().is_empty());

        s.kill_node("github").unwrap();
        s.finish();
        let log_len = s.narrative_log().len();
        assert_eq!(s.kill_node("github").unwrap(), 0);
        assert_eq!(s.narrative_log().len(), log_len);
    }

    #[test]
    fn test_decentralization_bounds() {
        let mut s = sim();
        let err = s.set_decentralization(101).unwrap_err();
        assert!(err.is(ErrorCode::DecentralizationOutOfRange));
        assert_eq!(s.decentralization(), 0);

        s.set_decentralization(70).unwrap();
        assert_eq!(s.decentralization(), 70);
        assert_eq!(s.graph().edges.len(), 38);

        s.set_decentralization(0).unwrap();
        assert_eq!(s.graph().edges.len(), 31);
    }

    #[test]
    fn test_decentralization_softens_scenario() {
        let mut fragile = sim();
        fragile.run_scenario(ScenarioId::AwsOutage);
        fragile.finish();

        let mut resilient = sim();
        resilient.set_decentralization(100).unwrap();
        resilient.run_scenario(ScenarioId::AwsOutage);
        resilient.finish();

        assert!(
            resilient.metrics().services_down < fragile.metrics().services_down
        );
    }

    #[test]
    fn test_analyze_site_replaces_previous_site() {
        let mut s = sim();
        s.analyze_site_url("netflix.com").unwrap();
        assert!(s.graph().contains("custom-netflix-com"));
        assert_eq!(s.graph().edges.len(), 31 + 4);

        s.analyze_site_url("zoom.us").unwrap();
        assert!(!s.graph().contains("custom-netflix-com"));
        assert!(s.graph().contains("custom-zoom-us"));
        assert_eq!(s.graph().nodes.len(), 19);

        // site survives a dial change
        s.set_decentralization(50).unwrap();
        assert!(s.graph().contains("custom-zoom-us"));
    }

    #[test]
    fn test_analysed_site_joins_cascade() {
        let mut s = sim();
        s.analyze_site_url("https://www.netflix.com").unwrap();
        s.run_scenario(ScenarioId::AwsOutage);
        s.finish();
        assert_eq!(s.status_of("custom-netflix-com"), NodeStatus::Down);
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut s = sim();
        s.set_decentralization(30).unwrap();
        s.analyze_site_url("github.com").unwrap();
        s.run_scenario(ScenarioId::DnsCollapse);
        s.advance();
        let generation = s.generation();

        s.reset();
        assert!(!s.is_running());
        assert!(s.generation() > generation);
        assert!(s.analyzed_site().is_none());
        assert_eq!(s.graph().edges.len(), 33);
        assert_eq!(s.metrics().percent_operational, 100);
        assert!(s.narrative_log().is_empty());
        assert!(s.comparison_metrics().is_none());
    }

    #[test]
    fn test_snapshot_carries_statuses() {
        let mut s = sim();
        s.run_scenario(ScenarioId::AwsOutage);
        s.advance();

        let snap = s.snapshot();
        assert!(snap.is_running);
        assert_eq!(snap.current_wave, 1);
        assert_eq!(snap.active_scenario, Some(ScenarioId::AwsOutage));
        let aws = snap.nodes.iter().find(|n| n.id == "aws").unwrap();
        assert_eq!(aws.status, NodeStatus::Down);

        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["activeScenario"], "aws-outage");
        assert_eq!(value["statusMap"]["aws"], "down");
    }

    #[test]
    fn test_from_config() {
        let config = StudioConfig {
            decentralization: 50,
            ..StudioConfig::default()
        };
        let s = Simulation::from_config(&config).unwrap();
        assert_eq!(s.graph().edges.len(), 36);

        let bad = StudioConfig {
            decentralization: 150,
            ..StudioConfig::default()
        };
        assert!(Simulation::from_config(&bad).is_err());
    }
}
