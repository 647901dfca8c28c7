//! Application settings: an optional YAML/JSON file plus `PITWALL_*` environment overrides.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LoadError;
use crate::optimizer::monte_carlo::DEFAULT_SAMPLES;
use crate::optimizer::ranking::DEFAULT_TOP_K;
use crate::optimizer::strategy_generator::DEFAULT_MAX_STOPS;
use crate::race::model::StrategyInput;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2_000;

pub const ENV_BIND: &str = "PITWALL_BIND";
pub const ENV_CONFIG: &str = "PITWALL_CONFIG";
pub const ENV_SAMPLES: &str = "PITWALL_SAMPLES";
pub const ENV_WORKERS: &str = "PITWALL_WORKERS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    pub samples: usize,
    pub top_k: usize,
    pub max_stops: u32,
    pub refresh_interval_ms: u64,
    /// 0 uses every core.
    pub workers: usize,
    /// Fixed seed for reproducible runs; fresh entropy per pass when absent.
    pub seed: Option<u64>,
    pub input: StrategyInput,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            samples: DEFAULT_SAMPLES,
            top_k: DEFAULT_TOP_K,
            max_stops: DEFAULT_MAX_STOPS,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            workers: 0,
            seed: None,
            input: StrategyInput::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, LoadError> {
        let config: Self = load_document(path)?;
        config.input.validate()?;
        Ok(config)
    }

    /// File named by `PITWALL_CONFIG` (or defaults), then env overrides on top.
    pub fn from_env() -> Result<Self, LoadError> {
        let mut config = match env::var(ENV_CONFIG) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim())?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = env::var(ENV_BIND) {
            if !bind.trim().is_empty() {
                self.bind = bind.trim().to_string();
            }
        }
        if let Some(samples) = parse_env_usize(ENV_SAMPLES) {
            self.samples = samples.max(1);
        }
        if let Some(workers) = parse_env_usize(ENV_WORKERS) {
            self.workers = workers;
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

fn parse_env_usize(name: &str) -> Option<usize> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("invalid {name} '{raw}', ignoring");
            None
        }
    }
}

/// Load and validate a race/track/car input file.
pub fn load_input(path: &str) -> Result<StrategyInput, LoadError> {
    let input: StrategyInput = load_document(path)?;
    input.validate()?;
    Ok(input)
}

/// Parse `path` as YAML when it ends in `.yaml`/`.yml`, JSON otherwise.
pub fn load_document<T: DeserializeOwned>(path: &str) -> Result<T, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_string(),
        source,
    })?;
    parse_document(path, &raw)
}

pub fn parse_document<T: DeserializeOwned>(path: &str, raw: &str) -> Result<T, LoadError> {
    let is_yaml = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(raw).map_err(|source| LoadError::Yaml {
            path: path.to_string(),
            source,
        })
    } else {
        serde_json::from_str(raw).map_err(|source| LoadError::Json {
            path: path.to_string(),
            source,
        })
    }
}
