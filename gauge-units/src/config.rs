//! Engine configuration

use serde::{Serialize, Deserialize};
use tracing::warn;
use gauge_core::Number;

const ENV_ALLOW_CUSTOM_FORMULAS: &str = "GAUGE_ALLOW_CUSTOM_FORMULAS";
const ENV_DEFAULT_PRECISION: &str = "GAUGE_DEFAULT_PRECISION";

/// Settings shared by every converter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Honor formula-based custom conversions
    pub allow_custom_formulas: bool,
    /// Result scale when neither the caller nor the units specify one
    pub default_precision: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            allow_custom_formulas: false,
            default_precision: 4,
        }
    }
}

impl EngineConfig {
    pub fn with_custom_formulas(mut self, allow: bool) -> Self {
        self.allow_custom_formulas = allow;
        self
    }

    pub fn with_default_precision(mut self, precision: u32) -> Self {
        self.default_precision = precision;
        self
    }

    /// Parse from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read `GAUGE_ALLOW_CUSTOM_FORMULAS` and `GAUGE_DEFAULT_PRECISION`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Unparseable or out-of-range values
    /// are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();

        if let Some(raw) = lookup(ENV_ALLOW_CUSTOM_FORMULAS) {
            match parse_flag(&raw) {
                Some(flag) => config.allow_custom_formulas = flag,
                None => warn!(key = ENV_ALLOW_CUSTOM_FORMULAS, value = %raw, "ignoring invalid boolean"),
            }
        }

        if let Some(raw) = lookup(ENV_DEFAULT_PRECISION) {
            match raw.trim().parse::<u32>() {
                Ok(precision) if precision <= Number::MAX_SCALE => config.default_precision = precision,
                _ => warn!(key = ENV_DEFAULT_PRECISION, value = %raw, "ignoring invalid precision"),
            }
        }

        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
