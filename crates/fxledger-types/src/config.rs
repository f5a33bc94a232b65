//! Configuration types for the ledger contract and settlement engine.

use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// How invocation arguments arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgEncoding {
    /// Function name and arguments are used as given.
    Plain,
    /// Function name and arguments are standard base64; values that do not
    /// decode are passed through unmodified.
    #[default]
    Base64,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format with colors.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON, one object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(LedgerError::Configuration(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Settlement engine behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// After each settlement, verify supply conservation for both
    /// currencies of the pair and fail the settlement on violation.
    pub verify_supply_after_settle: bool,
    /// Reject a settlement up front when a source position is missing,
    /// before any balance is written.
    pub preflight: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verify_supply_after_settle: false,
            preflight: true,
        }
    }
}

/// Top-level configuration for one ledger contract instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    pub engine: EngineConfig,
    pub arg_encoding: ArgEncoding,
    pub log_format: LogFormat,
}

impl LedgerConfig {
    /// Parse a JSON configuration document. Missing fields take defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| LedgerError::Configuration(e.to_string()))
    }
}
