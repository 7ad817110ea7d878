//! Cascade Studio: Tauri application entry point.
//!
//! Hosts the simulation behind IPC commands; the webview renders the graph,
//! metrics and narrative log.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use cascade_studio::commands::{self, AppState};
use cascade_studio::StudioConfig;
use tauri::Manager;
use tracing_subscriber::EnvFilter;

fn main() {
    let config = StudioConfig::load(None).unwrap_or_else(|e| {
        eprintln!("Ignoring config: {}", e);
        StudioConfig::default()
    });

    let filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| config.log_filter.clone())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let state = AppState::new(&config).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Falling back to default session");
        AppState::default()
    });

    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .manage(state)
        .setup(|app| {
            #[cfg(debug_assertions)]
            {
                if let Some(window) = app.get_webview_window("main") {
                    window.open_devtools();
                }
            }
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Session
            commands::get_snapshot,
            commands::reset_simulation,
            commands::set_decentralization,
            // Cascades
            commands::run_scenario,
            commands::kill_node,
            // Site analysis
            commands::analyze_site,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
