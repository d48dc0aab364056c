//! Scheduler configuration

use serde::{Deserialize, Serialize};

/// Settings for the owner-thread runner and the fallback pool
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Thread name of the owner-thread runner
    #[serde(default = "default_runner_name")]
    pub runner_name: String,
    /// Upper bound on fallback pool threads
    #[serde(default = "default_fallback_workers")]
    pub fallback_workers: usize,
}

fn default_runner_name() -> String {
    "scena-main".to_string()
}

fn default_fallback_workers() -> usize {
    4
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            runner_name: default_runner_name(),
            fallback_workers: default_fallback_workers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SchedulerConfig = toml::from_str("fallback_workers = 2").unwrap();
        assert_eq!(config.runner_name, "scena-main");
        assert_eq!(config.fallback_workers, 2);
        assert_eq!(toml::from_str::<SchedulerConfig>("").unwrap(), SchedulerConfig::default());
    }
}
