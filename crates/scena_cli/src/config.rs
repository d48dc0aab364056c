//! Scena configuration file handling

use anyhow::{Context, Result};
use scena_core::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up in a directory
pub const CONFIG_FILE: &str = "scena.toml";

/// Top-level configuration (scena.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ScenaConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub simulate: SimulateConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Defaults for `scena simulate`
#[derive(Debug, Deserialize, Serialize)]
pub struct SimulateConfig {
    /// Sessions created and exposed to scripting code
    #[serde(default = "default_sessions")]
    pub sessions: usize,
    /// Foreign threads raising platform events
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Events raised per thread
    #[serde(default = "default_events")]
    pub events: usize,
    /// Finalize every k-th session wrapper mid-run; 0 disables
    #[serde(default)]
    pub destroy_every: usize,
}

fn default_sessions() -> usize {
    8
}

fn default_threads() -> usize {
    4
}

fn default_events() -> usize {
    100
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            sessions: default_sessions(),
            threads: default_threads(),
            events: default_events(),
            destroy_every: 0,
        }
    }
}

impl ScenaConfig {
    /// Load configuration from a file, or from scena.toml in a directory
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let config_path = if path.is_file() {
            path.to_path_buf()
        } else {
            path.join(CONFIG_FILE)
        };

        if !config_path.exists() {
            anyhow::bail!(
                "No {CONFIG_FILE} found in {}. Run `scena init` to create one.",
                path.display()
            );
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ScenaConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    /// Load `path` if given, otherwise scena.toml in the working directory if
    /// present, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_dir(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load_from_dir(Path::new(".")),
            None => Ok(Self::default()),
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
