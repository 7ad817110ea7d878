//! `cascade`: run infrastructure failure scenarios from the terminal.
//!
//! Narrative goes to stdout, logs go to stderr. With `--json` stdout carries
//! a single JSON document instead.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use cascade_studio::graph::{InfraNode, NodeStatus};
use cascade_studio::insights::compute_insights;
use cascade_studio::metrics::Metrics;
use cascade_studio::narrative::NarrativeMessage;
use cascade_studio::playback::session_stream;
use cascade_studio::scenario::scenarios;
use cascade_studio::{CascadeError, ScenarioId, Simulation, StudioConfig};

/// Cascading failure simulator for internet infrastructure
#[derive(Parser, Debug)]
#[command(name = "cascade", version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path (default: ~/.cascade/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the preset scenarios
    Scenarios {
        #[arg(long)]
        json: bool,
    },
    /// Play a preset scenario wave by wave
    Run {
        /// Scenario id, e.g. dns-collapse
        scenario: ScenarioId,

        /// Decentralization level (0-100)
        #[arg(short, long)]
        level: Option<u32>,

        /// Pause between waves in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Print the final session snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Take nodes offline one after another
    Kill {
        /// Node ids, e.g. aws cloudflare-cdn
        #[arg(required = true)]
        nodes: Vec<String>,

        /// Run this scenario first and kill on top of its damage
        #[arg(long)]
        scenario: Option<ScenarioId>,

        /// Decentralization level (0-100)
        #[arg(short, long)]
        level: Option<u32>,

        #[arg(long)]
        json: bool,
    },
    /// Map a website onto the dependency graph
    Analyze {
        /// URL or bare domain
        url: String,

        /// Run this scenario against the graph with the site merged in
        #[arg(long)]
        scenario: Option<ScenarioId>,

        #[arg(long)]
        json: bool,
    },
    /// Show structural risk indicators of the graph
    Insights {
        /// Decentralization level (0-100)
        #[arg(short, long)]
        level: Option<u32>,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = StudioConfig::load(cli.config.as_deref())
        .context("Failed to load config")?;
    init_tracing(cli.verbose, &config);

    match cli.command {
        Commands::Scenarios { json } => list_scenarios(json),
        Commands::Run {
            scenario,
            level,
            delay_ms,
            json,
        } => {
            let mut sim = session(&config, level)?;
            sim.run_scenario(scenario);
            print_messages(sim.narrative_log(), json);

            let delay = match (json, delay_ms) {
                (true, _) => Duration::ZERO,
                (false, Some(ms)) => Duration::from_millis(ms),
                (false, None) => config.wave_delay(),
            };
            play(&mut sim, delay, json).await;
            report(&sim, json)
        }
        Commands::Kill {
            nodes,
            scenario,
            level,
            json,
        } => {
            let mut sim = session(&config, level)?;
            if let Some(scenario) = scenario {
                sim.run_scenario(scenario);
                sim.finish();
            }
            for id in &nodes {
                if !sim.graph().contains(id) {
                    return Err(CascadeError::unknown_node(id).into());
                }
                let before = sim.narrative_log().len();
                sim.kill_node(id)?;
                sim.finish();
                print_messages(&sim.narrative_log()[before..], json);
            }
            report(&sim, json)
        }
        Commands::Analyze {
            url,
            scenario,
            json,
        } => {
            let mut sim = session(&config, None)?;
            let analysis = sim.analyze_site_url(&url)?;
            print_messages(sim.narrative_log(), json);
            if !json {
                println!();
                println!("{}", analysis.summary);
            }

            let Some(scenario) = scenario else {
                if json {
                    println!("{}", serde_json::to_string_pretty(&analysis)?);
                }
                return Ok(());
            };

            sim.run_scenario(scenario);
            sim.finish();
            if json {
                return report(&sim, json);
            }
            print_messages(sim.narrative_log(), json);
            println!();
            println!(
                "{} under {}: {}",
                analysis.domain,
                scenario,
                sim.status_of(&analysis.node.id)
            );
            Ok(())
        }
        Commands::Insights { level, json } => {
            let sim = session(&config, level)?;
            let graph = sim.graph();
            let insights = compute_insights(&graph.nodes, &graph.edges);
            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                for insight in &insights {
                    println!(
                        "{} {}: {}",
                        insight.severity.icon(),
                        insight.label,
                        insight.value
                    );
                }
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8, config: &StudioConfig) {
    let filter = match verbose {
        0 => std::env::var("RUST_LOG")
            .ok()
            .or_else(|| config.log_filter.clone())
            .unwrap_or_else(|| "warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    tracing_subscriber::registry().with(stderr_layer).init();
}

/// Session from config, with an optional level override.
fn session(config: &StudioConfig, level: Option<u32>) -> Result<Simulation> {
    let mut sim = Simulation::from_config(config)?;
    if let Some(level) = level {
        sim.set_decentralization(level)?;
    }
    Ok(sim)
}

async fn play(sim: &mut Simulation, delay: Duration, quiet: bool) {
    let updates = session_stream(sim, delay);
    tokio::pin!(updates);
    while let Some(update) = updates.next().await {
        print_messages(&update.messages, quiet);
    }
}

fn list_scenarios(json: bool) -> Result<()> {
    let all = scenarios();
    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }
    for scenario in all {
        println!("{:<14} {}", scenario.id.as_str(), scenario.label);
        println!("{:<14} {}", "", scenario.description);
        println!("{:<14} kills: {}", "", scenario.kill_nodes.join(", "));
    }
    Ok(())
}

fn print_messages(messages: &[NarrativeMessage], quiet: bool) {
    if quiet {
        return;
    }
    for msg in messages {
        println!("[{}] {}", msg.timestamp, msg.text);
    }
}

fn report(sim: &Simulation, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
        return Ok(());
    }

    println!();
    print_metrics("Result", sim.metrics());
    if let Some(resilient) = sim.comparison_metrics() {
        print_metrics("Fully decentralized", resilient);
    }

    let down: Vec<&InfraNode> = sim
        .graph()
        .nodes
        .iter()
        .filter(|n| sim.status_of(&n.id) == NodeStatus::Down)
        .collect();
    if !down.is_empty() {
        let labels: Vec<&str> = down.iter().map(|n| n.label.as_str()).collect();
        println!("Offline: {}", labels.join(", "));
    }
    Ok(())
}

fn print_metrics(title: &str, m: &Metrics) {
    println!(
        "{:<20} {:>3}% operational | {}M users hit | ${}M/hr | {} down, {} degraded, {} healthy",
        format!("{}:", title),
        m.percent_operational,
        m.affected_users,
        m.financial_impact,
        m.services_down,
        m.services_degraded,
        m.services_healthy
    );
}
