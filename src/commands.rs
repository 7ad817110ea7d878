//! Tauri IPC commands: interface between the desktop frontend and the
//! simulation.
//!
//! Commands answer immediately with a snapshot. Cascades then play in a
//! background task that emits `cascade-wave` per wave and
//! `cascade-complete` with the final snapshot.

use std::sync::Mutex;
use std::time::Duration;
use tauri::{AppHandle, Emitter, Manager, State};

use crate::config::StudioConfig;
use crate::error::CascadeError;
use crate::scenario::ScenarioId;
use crate::simulation::{Simulation, SimulationSnapshot};
use crate::site::SiteAnalysis;

/// Emitted after each applied wave with a `WaveUpdate` payload.
pub const WAVE_EVENT: &str = "cascade-wave";
/// Emitted once a run completes with the final `SimulationSnapshot`.
pub const COMPLETE_EVENT: &str = "cascade-complete";

/// Application state shared across commands.
pub struct AppState {
    pub simulation: Mutex<Simulation>,
    pub wave_delay: Duration,
}

impl AppState {
    pub fn new(config: &StudioConfig) -> Result<Self, CascadeError> {
        Ok(Self {
            simulation: Mutex::new(Simulation::from_config(config)?),
            wave_delay: config.wave_delay(),
        })
    }
}

impl Default for AppState {
    fn default() -> Self {
        let config = StudioConfig::default();
        Self {
            simulation: Mutex::new(Simulation::new()),
            wave_delay: config.wave_delay(),
        }
    }
}

fn ipc_error(e: CascadeError) -> String {
    e.to_json()
}

/// Play the pending run of `generation` in the background.
///
/// Stops quietly once the session moves to another generation, which is how
/// a reset or a new scenario cancels playback.
fn spawn_playback(app: AppHandle, generation: u64, delay: Duration) {
    tauri::async_runtime::spawn(async move {
        loop {
            tokio::time::sleep(delay).await;

            let state = app.state::<AppState>();
            let (update, snapshot) = {
                let Ok(mut sim) = state.simulation.lock() else {
                    break;
                };
                if sim.generation() != generation {
                    break;
                }
                let Some(update) = sim.advance() else {
                    break;
                };
                let snapshot = update.complete.then(|| sim.snapshot());
                (update, snapshot)
            };

            let _ = app.emit(WAVE_EVENT, &update);
            if let Some(snapshot) = snapshot {
                let _ = app.emit(COMPLETE_EVENT, &snapshot);
                break;
            }
        }
    });
}

/// Current session state.
#[tauri::command]
pub async fn get_snapshot(state: State<'_, AppState>) -> Result<SimulationSnapshot, String> {
    let sim = state.simulation.lock().map_err(|e| e.to_string())?;
    Ok(sim.snapshot())
}

/// Start a preset scenario, abandoning any running cascade.
#[tauri::command]
pub async fn run_scenario(
    app: AppHandle,
    state: State<'_, AppState>,
    scenario: ScenarioId,
) -> Result<SimulationSnapshot, String> {
    let mut sim = state.simulation.lock().map_err(|e| e.to_string())?;

    sim.run_scenario(scenario);
    if sim.is_running() {
        spawn_playback(app, sim.generation(), state.wave_delay);
    }

    Ok(sim.snapshot())
}

/// Take a node offline on top of the current damage.
#[tauri::command]
pub async fn kill_node(
    app: AppHandle,
    state: State<'_, AppState>,
    node_id: String,
) -> Result<SimulationSnapshot, String> {
    let mut sim = state.simulation.lock().map_err(|e| e.to_string())?;

    let waves = sim.kill_node(&node_id).map_err(ipc_error)?;
    if waves > 0 {
        spawn_playback(app, sim.generation(), state.wave_delay);
    }

    Ok(sim.snapshot())
}

/// Analyse a site and merge it into the graph.
#[tauri::command]
pub async fn analyze_site(state: State<'_, AppState>, url: String) -> Result<SiteAnalysis, String> {
    let mut sim = state.simulation.lock().map_err(|e| e.to_string())?;
    sim.analyze_site_url(&url).map_err(ipc_error)
}

/// Cancel playback and restore the untouched graph.
#[tauri::command]
pub async fn reset_simulation(state: State<'_, AppState>) -> Result<SimulationSnapshot, String> {
    let mut sim = state.simulation.lock().map_err(|e| e.to_string())?;
    sim.reset();
    Ok(sim.snapshot())
}

/// Move the decentralization dial.
#[tauri::command]
pub async fn set_decentralization(
    state: State<'_, AppState>,
    level: u32,
) -> Result<SimulationSnapshot, String> {
    let mut sim = state.simulation.lock().map_err(|e| e.to_string())?;
    sim.set_decentralization(level).map_err(ipc_error)?;
    Ok(sim.snapshot())
}
