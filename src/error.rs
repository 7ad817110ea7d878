//! Unified error system for Cascade Studio.
//!
//! The simulation core is total over its inputs and never returns errors.
//! Errors only arise at the boundary: looking up scenarios and nodes by id,
//! validating dial values, orchestrator state checks and configuration IO.
//! They serialize to JSON so the desktop frontend can show the message
//! together with recovery hints.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cascade_studio::error::{CascadeError, ErrorCode};
//! use cascade_studio::cascade_err;
//!
//! let err = CascadeError::new(ErrorCode::UnknownScenario, "no scenario 'x'");
//! let err = cascade_err!(UnknownNode, "no node '{}'", id);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes, grouped by thousands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    // Scenario errors (1xxx)
    UnknownScenario = 1001,

    // Graph errors (2xxx)
    UnknownNode = 2001,
    DecentralizationOutOfRange = 2002,

    // Simulation errors (3xxx)
    SimulationBusy = 3001,

    // Config errors (5xxx)
    ConfigInvalid = 5001,
    ConfigEnvInvalid = 5002,

    // IO errors (7xxx)
    FileNotFound = 7003,
    FilePermissionDenied = 7004,
    FileWriteFailed = 7005,

    // Unknown/fallback
    Unknown = 0,
}

impl ErrorCode {
    /// Get the category name for this error code.
    pub fn category(&self) -> &'static str {
        match (*self as u16) / 1000 {
            1 => "scenario",
            2 => "graph",
            3 => "simulation",
            5 => "config",
            7 => "io",
            _ => "unknown",
        }
    }

    /// Whether retrying (possibly with different input) can succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ErrorCode::FilePermissionDenied | ErrorCode::Unknown)
    }

    /// Default recovery hints for this error code.
    pub fn default_hints(&self) -> Vec<&'static str> {
        match self {
            ErrorCode::UnknownScenario => vec![
                "Run 'cascade scenarios' to list the available presets",
                "Scenario ids are kebab-case, e.g. 'dns-collapse'",
            ],
            ErrorCode::UnknownNode => vec![
                "Node ids are kebab-case, e.g. 'dns-root' or 'cloudflare-cdn'",
                "Analysed sites use ids prefixed with 'custom-'",
            ],
            ErrorCode::DecentralizationOutOfRange => {
                vec!["Decentralization level must be between 0 and 100"]
            }
            ErrorCode::SimulationBusy => vec![
                "Wait for the current cascade to finish",
                "Reset the simulation to abandon the running cascade",
            ],
            ErrorCode::ConfigInvalid => vec![
                "Check the YAML syntax of the config file",
                "Delete the file to fall back to defaults",
            ],
            ErrorCode::ConfigEnvInvalid => {
                vec!["CASCADE_LEVEL must be an integer between 0 and 100"]
            }
            ErrorCode::FileNotFound => vec![
                "Check if the path is correct",
                "Verify the file exists",
            ],
            ErrorCode::FilePermissionDenied => vec![
                "Check file permissions",
                "Run with appropriate permissions",
            ],
            _ => vec![],
        }
    }
}

/// Structured error returned across the CLI and IPC boundary.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("[{error_id}] {message}")]
pub struct CascadeError {
    pub error_id: String,
    pub code: u16,
    pub category: String,
    pub message: String,
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recovery_hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl CascadeError {
    /// Create a new CascadeError with default hints.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let hints = code.default_hints();
        Self {
            error_id: format!("CS-{:04}", code as u16),
            code: code as u16,
            category: code.category().to_string(),
            message: message.into(),
            recoverable: code.is_recoverable(),
            recovery_hints: hints.into_iter().map(String::from).collect(),
            cause: None,
        }
    }

    /// Replace the default recovery hints.
    pub fn with_hints(mut self, hints: Vec<&str>) -> Self {
        self.recovery_hints = hints.into_iter().map(String::from).collect();
        self
    }

    /// Add cause (original error message) for debugging.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Create from a standard error, preserving the original message as cause.
    pub fn from_error<E: std::error::Error>(code: ErrorCode, error: E) -> Self {
        Self::new(code, error.to_string()).with_cause(format!("{:?}", error))
    }

    pub fn unknown_scenario(id: &str) -> Self {
        Self::new(
            ErrorCode::UnknownScenario,
            format!("Unknown scenario: {}", id),
        )
    }

    pub fn unknown_node(id: &str) -> Self {
        Self::new(ErrorCode::UnknownNode, format!("Unknown node: {}", id))
    }

    /// Whether this error carries the given code.
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code as u16
    }

    /// Convert to JSON string for IPC return.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

pub type Result<T> = std::result::Result<T, CascadeError>;

// Convenience macro for creating errors
#[macro_export]
macro_rules! cascade_err {
    ($code:ident, $msg:expr) => {
        $crate::error::CascadeError::new($crate::error::ErrorCode::$code, $msg)
    };
    ($code:ident, $fmt:expr, $($arg:tt)*) => {
        $crate::error::CascadeError::new(
            $crate::error::ErrorCode::$code,
            format!($fmt, $($arg)*)
        )
    };
}

impl From<std::io::Error> for CascadeError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => CascadeError::from_error(ErrorCode::FileNotFound, e),
            std::io::ErrorKind::PermissionDenied => {
                CascadeError::from_error(ErrorCode::FilePermissionDenied, e)
            }
            _ => CascadeError::from_error(ErrorCode::FileWriteFailed, e),
        }
    }
}

impl From<serde_yaml::Error> for CascadeError {
    fn from(e: serde_yaml::Error) -> Self {
        CascadeError::from_error(ErrorCode::ConfigInvalid, e)
    }
}

impl From<serde_json::Error> for CascadeError {
    fn from(e: serde_json::Error) -> Self {
        CascadeError::from_error(ErrorCode::ConfigInvalid, e)
    }
}
