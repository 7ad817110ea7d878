//! Scripted operator log for cascade playback.
//!
//! Every message carries a wall-clock style `HH:MM:SS` stamp. Stamps come
//! from a [`NarrativeClock`], which simulates a chaos agent typing: each
//! line lands a little after the previous one. Seeding the clock makes a
//! log reproducible.

use chrono::{Duration, Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::graph::{find_node, InfraEdge, InfraNode, InfraType, NodeStatus};
use crate::insights::{Insight, Severity};
use crate::metrics::Metrics;
use crate::propagation::StatusChange;
use crate::scenario::Scenario;
use crate::site::SiteAnalysis;

/// Simulated seconds between consecutive waves.
const SECONDS_PER_WAVE: i64 = 3;
/// Per-line jitter range in milliseconds.
const JITTER_MS: std::ops::Range<i64> = 200..1000;
/// Fixed per-line step of the final report.
const REPORT_STEP_MS: i64 = 500;

/// Presentation class of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeKind {
    Info,
    Warning,
    Error,
    Success,
    Analysis,
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeMessage {
    pub timestamp: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: NarrativeKind,
}

/// Simulated clock for message stamps.
#[derive(Debug, Clone)]
pub struct NarrativeClock {
    now: NaiveDateTime,
    rng: StdRng,
}

impl NarrativeClock {
    pub fn new(base: NaiveDateTime, seed: u64) -> Self {
        Self {
            now: base,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Clock starting at local time. Without a seed the jitter is random.
    pub fn starting_now(seed: Option<u64>) -> Self {
        let now = Local::now().naive_local();
        match seed {
            Some(seed) => Self::new(now, seed),
            None => Self {
                now,
                rng: StdRng::from_entropy(),
            },
        }
    }

    /// Shift forward to where wave `wave_index` starts.
    pub fn at_wave(mut self, wave_index: usize) -> Self {
        self.now += Duration::seconds(SECONDS_PER_WAVE * wave_index as i64);
        self
    }

    /// Advance by a random 200-999 ms and return the new stamp.
    pub fn tick(&mut self) -> String {
        let jitter = self.rng.gen_range(JITTER_MS);
        self.step(jitter)
    }

    /// Advance by exactly `millis` and return the new stamp.
    pub fn step(&mut self, millis: i64) -> String {
        self.now += Duration::milliseconds(millis);
        self.now.format("%H:%M:%S").to_string()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }
}

/// Collects messages against a clock.
struct Log<'c> {
    clock: &'c mut NarrativeClock,
    step_ms: Option<i64>,
    messages: Vec<NarrativeMessage>,
}

impl<'c> Log<'c> {
    fn jittered(clock: &'c mut NarrativeClock) -> Self {
        Self {
            clock,
            step_ms: None,
            messages: Vec::new(),
        }
    }

    fn steady(clock: &'c mut NarrativeClock, step_ms: i64) -> Self {
        Self {
            clock,
            step_ms: Some(step_ms),
            messages: Vec::new(),
        }
    }

    fn push(&mut self, kind: NarrativeKind, text: impl Into<String>) {
        let timestamp = match self.step_ms {
            Some(ms) => self.clock.step(ms),
            None => self.clock.tick(),
        };
        self.messages.push(NarrativeMessage {
            timestamp,
            text: text.into(),
            kind,
        });
    }

    fn finish(self) -> Vec<NarrativeMessage> {
        self.messages
    }
}

// =============================================================================
// Wave narrative
// =============================================================================

/// Narrate one wave using a clock started at the current local time.
pub fn generate_narrative_for_wave(
    wave_index: usize,
    wave: &[StatusChange],
    nodes: &[InfraNode],
    total_waves: usize,
) -> Vec<NarrativeMessage> {
    let mut clock = NarrativeClock::starting_now(None).at_wave(wave_index);
    generate_narrative_for_wave_with_clock(&mut clock, wave_index, wave, nodes, total_waves)
}

/// Narrate one wave.
///
/// Wave 0 reads as direct hits on the targets; later waves read as the
/// cascade reaching dependents. Changes naming nodes not in `nodes` are
/// skipped. The last wave closes with a hand-off to the final report.
pub fn generate_narrative_for_wave_with_clock(
    clock: &mut NarrativeClock,
    wave_index: usize,
    wave: &[StatusChange],
    nodes: &[InfraNode],
    total_waves: usize,
) -> Vec<NarrativeMessage> {
    use NarrativeKind::*;

    let mut log = Log::jittered(clock);

    if wave_index == 0 {
        log.push(
            Info,
            "🦞 OpenClaw Chaos Agent initializing resilience scan...",
        );
    }

    for change in wave {
        let Some(node) = find_node(nodes, &change.node_id) else {
            continue;
        };

        if wave_index == 0 {
            log.push(
                Info,
                format!(
                    "Attempting to reach {} ({})...",
                    node.label,
                    node.infra_type.description()
                ),
            );
            log.push(
                Error,
                format!("Connection refused. {} is OFFLINE.", node.label),
            );
            log.push(Warning, "Retrying via alternative endpoint...");
            log.push(Error, "Timeout after 2000ms. No fallback available.");
        } else if change.new_status == NodeStatus::Down {
            log.push(Info, format!("Attempting to access {}...", node.label));
            log.push(Error, change.reason.clone());
            log.push(
                Error,
                format!(
                    "{} - STATUS: DOWN. {}M users affected.",
                    node.label, node.user_count
                ),
            );
        } else {
            log.push(
                Warning,
                format!("{} responding slowly... {}", node.label, change.reason),
            );
            log.push(
                Warning,
                format!(
                    "{} - STATUS: DEGRADED. Partial functionality available.",
                    node.label
                ),
            );
        }
    }

    if wave_index + 1 == total_waves {
        log.push(
            Analysis,
            "Cascade propagation complete. Analyzing systemic impact...",
        );
    }

    log.finish()
}

// =============================================================================
// Final report
// =============================================================================

/// Resilience report for a finished cascade.
pub fn generate_final_analysis(metrics: &Metrics, insights: &[Insight]) -> Vec<NarrativeMessage> {
    let mut clock = NarrativeClock::starting_now(None);
    generate_final_analysis_with_clock(&mut clock, metrics, insights)
}

pub fn generate_final_analysis_with_clock(
    clock: &mut NarrativeClock,
    metrics: &Metrics,
    insights: &[Insight],
) -> Vec<NarrativeMessage> {
    use NarrativeKind::*;

    let mut log = Log::steady(clock, REPORT_STEP_MS);

    log.push(Analysis, "━━━ RESILIENCE ANALYSIS REPORT ━━━");
    log.push(
        if metrics.percent_operational < 50 {
            Error
        } else {
            Warning
        },
        format!(
            "Internet operational: {}%  |  Affected users: {}M  |  Financial impact: ${}M/hr",
            metrics.percent_operational, metrics.affected_users, metrics.financial_impact
        ),
    );
    log.push(
        Info,
        format!(
            "Services down: {}  |  Degraded: {}  |  Healthy: {}",
            metrics.services_down, metrics.services_degraded, metrics.services_healthy
        ),
    );

    for insight in insights {
        let kind = if insight.severity == Severity::Critical {
            Error
        } else {
            Warning
        };
        log.push(
            kind,
            format!(
                "{} {}: {}",
                insight.severity.icon(),
                insight.label,
                insight.value
            ),
        );
    }

    log.push(
        Analysis,
        "Conclusion: Modern internet infrastructure is optimized for efficiency, not resilience.",
    );

    log.finish()
}

// =============================================================================
// Banners and site narrative
// =============================================================================

/// Opening lines for a preset scenario run.
pub fn scenario_banner(clock: &mut NarrativeClock, scenario: &Scenario) -> Vec<NarrativeMessage> {
    let mut log = Log::jittered(clock);
    log.push(
        NarrativeKind::Analysis,
        format!("━━━ SCENARIO: {} ━━━", scenario.label.to_uppercase()),
    );
    log.push(NarrativeKind::Info, scenario.description);
    log.finish()
}

/// Opening lines for an operator-initiated kill.
pub fn manual_kill_banner(clock: &mut NarrativeClock, node: &InfraNode) -> Vec<NarrativeMessage> {
    let mut log = Log::jittered(clock);
    log.push(
        NarrativeKind::Analysis,
        format!("━━━ MANUAL KILL: {} ━━━", node.label.to_uppercase()),
    );
    log.push(
        NarrativeKind::Warning,
        format!(
            "Operator manually terminated {}. Analyzing cascade...",
            node.label
        ),
    );
    log.finish()
}

/// Walk through a site analysis. Provider edges are grouped by the type of
/// their source node in `nodes`; edges from unknown sources are not reported.
pub fn generate_site_narrative(
    clock: &mut NarrativeClock,
    analysis: &SiteAnalysis,
    nodes: &[InfraNode],
) -> Vec<NarrativeMessage> {
    use NarrativeKind::*;

    let mut log = Log::jittered(clock);

    log.push(
        Analysis,
        format!("━━━ SITE ANALYSIS: {} ━━━", analysis.domain.to_uppercase()),
    );
    log.push(Info, format!("🦞 OpenClaw scanning {}...", analysis.url));
    log.push(Info, format!("Resolving DNS for {}...", analysis.domain));
    log.push(Info, "Infrastructure detected, mapping dependencies...");

    let edges = &analysis.edges;
    let from_type = move |infra_type: InfraType| {
        edges
            .iter()
            .filter(move |e| source_type(nodes, e) == Some(infra_type))
    };

    for edge in from_type(InfraType::Dns) {
        let (tag, kind) = if edge.critical {
            ("CRITICAL", Warning)
        } else {
            ("non-critical", Info)
        };
        log.push(kind, format!("DNS → {} ({})", edge.source, tag));
    }

    let clouds: Vec<_> = from_type(InfraType::Cloud).collect();
    for edge in &clouds {
        let (tag, kind) = if edge.critical {
            ("CRITICAL", Warning)
        } else {
            ("failover available", Success)
        };
        log.push(kind, format!("Cloud → {} ({})", edge.source, tag));
    }

    for edge in from_type(InfraType::Cdn) {
        log.push(Info, format!("CDN → {} (performance layer)", edge.source));
    }

    if clouds.len() == 1 {
        log.push(Error, "⚠️  SINGLE CLOUD PROVIDER: no failover detected!");
    }
    if from_type(InfraType::Dns).any(|e| e.source == "dns-root") {
        log.push(
            Warning,
            "⚠️  Relies on root DNS: vulnerable to DNS-level attacks",
        );
    }

    log.push(
        Success,
        format!(
            "{} added to dependency graph. Click scenarios to see impact.",
            analysis.domain
        ),
    );

    log.finish()
}

fn source_type(nodes: &[InfraNode], edge: &InfraEdge) -> Option<InfraType> {
    find_node(nodes, &edge.source).map(|n| n.infra_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{default_edges, default_nodes};
    use crate::insights::compute_insights;
    use crate::metrics::compute_metrics;
    use crate::propagation::{apply_waves, propagate_failure};
    use crate::scenario::ScenarioId;
    use crate::site::analyze_site;
    use chrono::NaiveDate;

    fn clock() -> NarrativeClock {
        let base = NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        NarrativeClock::new(base, 42)
    }

    fn texts(messages: &[NarrativeMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_first_wave_narrates_direct_hits() {
        let nodes = default_nodes();
        let waves = propagate_failure(&nodes, &default_edges(), &["dns-root"]);
        let msgs =
            generate_narrative_for_wave_with_clock(&mut clock(), 0, &waves[0], &nodes, waves.len());

        assert_eq!(msgs.len(), 5);
        assert_eq!(
            texts(&msgs),
            vec![
                "🦞 OpenClaw Chaos Agent initializing resilience scan...",
                "Attempting to reach Root DNS (DNS provider)...",
                "Connection refused. Root DNS is OFFLINE.",
                "Retrying via alternative endpoint...",
                "Timeout after 2000ms. No fallback available.",
            ]
        );
        assert_eq!(msgs[2].kind, NarrativeKind::Error);
        assert_eq!(msgs[3].kind, NarrativeKind::Warning);
    }

    #[test]
    fn test_later_waves_narrate_down_and_degraded() {
        let nodes = default_nodes();
        let wave = vec![
            StatusChange {
                node_id: "bank-app".to_string(),
                new_status: NodeStatus::Down,
                reason: "Critical dependency Root DNS is down.".to_string(),
            },
            StatusChange {
                node_id: "stripe".to_string(),
                new_status: NodeStatus::Degraded,
                reason: "Non-critical dependency Root DNS is down.".to_string(),
            },
        ];
        let msgs = generate_narrative_for_wave_with_clock(&mut clock(), 1, &wave, &nodes, 2);

        assert_eq!(
            texts(&msgs),
            vec![
                "Attempting to access Banking Services...",
                "Critical dependency Root DNS is down.",
                "Banking Services - STATUS: DOWN. 500M users affected.",
                "Stripe responding slowly... Non-critical dependency Root DNS is down.",
                "Stripe - STATUS: DEGRADED. Partial functionality available.",
                "Cascade propagation complete. Analyzing systemic impact...",
            ]
        );
        assert_eq!(msgs.last().map(|m| m.kind), Some(NarrativeKind::Analysis));
    }

    #[test]
    fn test_unknown_nodes_are_skipped() {
        let wave = vec![StatusChange {
            node_id: "ghost".to_string(),
            new_status: NodeStatus::Down,
            reason: String::new(),
        }];
        let nodes = default_nodes();
        let msgs = generate_narrative_for_wave_with_clock(&mut clock(), 1, &wave, &nodes, 5);
        assert!(msgs.is_empty());
    }

    #[test]
    fn test_clock_is_monotonic_and_seeded() {
        let mut a = clock();
        let mut b = clock();
        let stamps_a: Vec<String> = (0..20).map(|_| a.tick()).collect();
        let stamps_b: Vec<String> = (0..20).map(|_| b.tick()).collect();
        assert_eq!(stamps_a, stamps_b);

        let mut sorted = stamps_a.clone();
        sorted.sort();
        assert_eq!(stamps_a, sorted);
        // 20 ticks of 200-999 ms stay within 4-20 s
        assert!(stamps_a[0].starts_with("12:00:0"));
        let last = stamps_a[19].as_str();
        assert!(("12:00:04"..="12:00:20").contains(&last));
    }

    #[test]
    fn test_wave_offset() {
        let mut c = clock().at_wave(4);
        assert_eq!(c.step(0), "12:00:12");
    }

    #[test]
    fn test_final_analysis() {
        let nodes = default_nodes();
        let edges = default_edges();
        let waves = propagate_failure(&nodes, &edges, &["dns-root"]);
        let status = apply_waves(&crate::graph::baseline_status(&nodes), &waves);
        let metrics = compute_metrics(&nodes, &status);
        let insights = compute_insights(&nodes, &edges);

        let msgs = generate_final_analysis_with_clock(&mut clock(), &metrics, &insights);
        assert_eq!(msgs.len(), 3 + insights.len() + 1);
        assert_eq!(msgs[0].text, "━━━ RESILIENCE ANALYSIS REPORT ━━━");
        assert_eq!(msgs[1].kind, NarrativeKind::Error);
        assert!(msgs[1].text.contains("Financial impact: $312M/hr"));
        assert_eq!(
            msgs[2].text,
            "Services down: 7  |  Degraded: 5  |  Healthy: 5"
        );
        assert_eq!(
            msgs[7].text,
            "🔴 Single points of failure: Root DNS, AWS, Cloudflare CDN"
        );
        assert_eq!(msgs[7].kind, NarrativeKind::Error);
        assert_eq!(msgs[3].kind, NarrativeKind::Warning);
        // steady half-second cadence
        assert_eq!(msgs[0].timestamp, "12:00:00");
        assert_eq!(msgs[2].timestamp, "12:00:01");
    }

    #[test]
    fn test_healthy_report_is_warning() {
        let nodes = default_nodes();
        let metrics = Metrics::baseline(&nodes);
        let msgs = generate_final_analysis_with_clock(&mut clock(), &metrics, &[]);
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[1].kind, NarrativeKind::Warning);
    }

    #[test]
    fn test_banners() {
        let scenario = ScenarioId::DnsCollapse.scenario();
        let msgs = scenario_banner(&mut clock(), &scenario);
        assert_eq!(msgs[0].text, "━━━ SCENARIO: DNS COLLAPSE ━━━");
        assert_eq!(msgs[1].text, scenario.description);

        let nodes = default_nodes();
        let aws = find_node(&nodes, "aws").unwrap();
        let msgs = manual_kill_banner(&mut clock(), aws);
        assert_eq!(msgs[0].text, "━━━ MANUAL KILL: AWS ━━━");
        assert_eq!(msgs[1].kind, NarrativeKind::Warning);
    }

    #[test]
    fn test_site_narrative() {
        let analysis = analyze_site("netflix.com");
        let msgs = generate_site_narrative(&mut clock(), &analysis, &default_nodes());
        let lines = texts(&msgs);

        assert_eq!(lines[0], "━━━ SITE ANALYSIS: NETFLIX.COM ━━━");
        assert_eq!(lines[1], "🦞 OpenClaw scanning https://netflix.com...");
        assert!(lines.contains(&"DNS → dns-root (CRITICAL)"));
        assert!(lines.contains(&"Cloud → aws (CRITICAL)"));
        assert!(lines.contains(&"CDN → cloudflare-cdn (performance layer)"));
        assert!(lines.contains(&"⚠️  SINGLE CLOUD PROVIDER: no failover detected!"));
        assert!(lines.contains(&"⚠️  Relies on root DNS: vulnerable to DNS-level attacks"));
        assert_eq!(
            lines.last().copied(),
            Some("netflix.com added to dependency graph. Click scenarios to see impact.")
        );
    }

    #[test]
    fn test_site_narrative_with_failover() {
        let analysis = analyze_site("zoom.us");
        let msgs = generate_site_narrative(&mut clock(), &analysis, &default_nodes());
        let lines = texts(&msgs);

        assert!(lines.contains(&"Cloud → aws (failover available)"));
        assert!(lines.contains(&"Cloud → azure (failover available)"));
        assert!(!lines.iter().any(|l| l.contains("SINGLE CLOUD")));
        assert!(!lines.iter().any(|l| l.contains("root DNS")));
    }

    #[test]
    fn test_message_serializes_type_field() {
        let msg = NarrativeMessage {
            timestamp: "12:00:00".to_string(),
            text: "hi".to_string(),
            kind: NarrativeKind::Analysis,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "analysis");
    }
}
