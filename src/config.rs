use crate::kernel::mutation::OperationKind;
use crate::kernel::time::Contiguity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    InvalidVar {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("contiguity step and tolerance must be finite and non-negative")]
    InvalidContiguity,
}

/// POST paths of the mutation endpoints, relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub delete: String,
    pub merge: String,
    pub split: String,
    pub recalculate: String,
    pub undo: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            delete: "/delete_segments".to_string(),
            merge: "/merge_segments".to_string(),
            split: "/split_segment".to_string(),
            recalculate: "/recalculate_segmentation".to_string(),
            undo: "/undo".to_string(),
        }
    }
}

impl Endpoints {
    pub fn path(&self, op: OperationKind) -> &str {
        match op {
            OperationKind::Delete => &self.delete,
            OperationKind::Merge => &self.merge,
            OperationKind::Split => &self.split,
            OperationKind::Recalculate => &self.recalculate,
            OperationKind::Undo => &self.undo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub contiguity: Contiguity,
    pub endpoints: Endpoints,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            contiguity: Contiguity::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `BREATHLINE_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("BREATHLINE_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("BREATHLINE_TIMEOUT_MS") {
            config.request_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                var: "BREATHLINE_TIMEOUT_MS",
                expected: "millisecond count",
                value: raw.clone(),
            })?;
        }

        let step = parse_units(&lookup, "BREATHLINE_STEP")?;
        let tolerance = parse_units(&lookup, "BREATHLINE_TOLERANCE")?;
        if step.is_some() || tolerance.is_some() {
            let defaults = Contiguity::default();
            let step = step.unwrap_or_else(|| defaults.step.as_units());
            let tolerance = tolerance.unwrap_or_else(|| defaults.tolerance.as_units());
            if step < 0.0 || tolerance < 0.0 {
                return Err(ConfigError::InvalidContiguity);
            }
            config.contiguity = Contiguity::new(step, tolerance);
        }

        Ok(config)
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn url_for(&self, op: OperationKind) -> String {
        format!("{}{}", self.base_url, self.endpoints.path(op))
    }
}

fn parse_units<F>(lookup: &F, var: &'static str) -> Result<Option<f64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ConfigError::InvalidVar {
            var,
            expected: "number",
            value: raw,
        }),
    }
}
