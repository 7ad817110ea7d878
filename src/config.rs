//! Studio settings from `~/.cascade/config.yaml`.
//!
//! ```yaml
//! decentralization: 30
//! wave_delay_ms: 800
//! narrative_seed: 42
//! log_filter: cascade_studio=debug
//! ```
//!
//! Every key is optional. `CASCADE_LEVEL` overrides `decentralization`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cascade_err;
use crate::error::Result;
use crate::simulation::MAX_DECENTRALIZATION;

/// Environment variable overriding the decentralization level.
pub const LEVEL_ENV_VAR: &str = "CASCADE_LEVEL";

/// Pause between waves during playback, matching the desktop animation.
const DEFAULT_WAVE_DELAY_MS: u64 = 1200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Initial decentralization level, 0-100
    pub decentralization: u32,
    pub wave_delay_ms: u64,
    /// Fixed seed for narrative timestamp jitter
    pub narrative_seed: Option<u64>,
    /// `tracing` filter directive used when no `RUST_LOG` is set
    pub log_filter: Option<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            decentralization: 0,
            wave_delay_ms: DEFAULT_WAVE_DELAY_MS,
            narrative_seed: None,
            log_filter: None,
        }
    }
}

impl StudioConfig {
    /// `~/.cascade/config.yaml`, when a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".cascade").join("config.yaml"))
    }

    /// Load settings and apply the environment override.
    ///
    /// An explicit `path` must exist. The default location is optional and
    /// yields defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.with_level_override(std::env::var(LEVEL_ENV_VAR).ok().as_deref())
    }

    /// Parse and validate one YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)
            .map_err(|e| e.with_cause(format!("while reading {}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded studio config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file is a valid, all-default config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.decentralization > MAX_DECENTRALIZATION {
            return Err(cascade_err!(
                ConfigInvalid,
                "decentralization must be at most {}, got {}",
                MAX_DECENTRALIZATION,
                self.decentralization
            ));
        }
        Ok(())
    }

    /// Apply a `CASCADE_LEVEL` value, if one is set.
    pub fn with_level_override(mut self, value: Option<&str>) -> Result<Self> {
        let Some(raw) = value else {
            return Ok(self);
        };
        let level = raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|level| *level <= MAX_DECENTRALIZATION)
            .ok_or_else(|| {
                cascade_err!(ConfigEnvInvalid, "Invalid {}: '{}'", LEVEL_ENV_VAR, raw)
            })?;
        self.decentralization = level;
        Ok(self)
    }

    pub fn wave_delay(&self) -> Duration {
        Duration::from_millis(self.wave_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.decentralization, 0);
        assert_eq!(config.wave_delay(), Duration::from_millis(1200));
        assert!(config.narrative_seed.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            "decentralization: 30\nwave_delay_ms: 250\nnarrative_seed: 9\nlog_filter: debug\n",
        );
        let config = StudioConfig::from_file(file.path()).unwrap();
        assert_eq!(config.decentralization, 30);
        assert_eq!(config.wave_delay_ms, 250);
        assert_eq!(config.narrative_seed, Some(9));
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_and_empty_files() {
        let file = write_config("narrative_seed: 1\n");
        let config = StudioConfig::from_file(file.path()).unwrap();
        assert_eq!(config.wave_delay_ms, 1200);
        assert_eq!(config.narrative_seed, Some(1));

        let file = write_config("");
        assert_eq!(
            StudioConfig::from_file(file.path()).unwrap(),
            StudioConfig::default()
        );
    }

    #[test]
    fn test_invalid_files() {
        let file = write_config("decentralization: [oops\n");
        let err = StudioConfig::from_file(file.path()).unwrap_err();
        assert!(err.is(ErrorCode::ConfigInvalid));
        assert!(err.cause.is_some());

        let file = write_config("decentralization: 250\n");
        let err = StudioConfig::from_file(file.path()).unwrap_err();
        assert!(err.is(ErrorCode::ConfigInvalid));
    }

    #[test]
    fn test_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = StudioConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(err.is(ErrorCode::FileNotFound));
    }

    #[test]
    fn test_level_override() {
        let config = StudioConfig::default()
            .with_level_override(Some(" 70 "))
            .unwrap();
        assert_eq!(config.decentralization, 70);

        let config = StudioConfig::default().with_level_override(None).unwrap();
        assert_eq!(config.decentralization, 0);

        for bad in ["high", "101", "-5"] {
            let err = StudioConfig::default()
                .with_level_override(Some(bad))
                .unwrap_err();
            assert!(err.is(ErrorCode::ConfigEnvInvalid), "{} accepted", bad);
        }
    }
}
