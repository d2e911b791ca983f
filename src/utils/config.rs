use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::ReportFormat;

/// Harness configuration
///
/// Resolved in increasing precedence: built-in defaults, YAML file, `QA_*`
/// environment variables, command line flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Timeout for a single adapter operation (ms)
    pub adapter_timeout_ms: u64,

    /// Run the browser without a window
    pub headless: bool,

    /// Browser executable override, discovered on PATH when unset
    pub browser_executable: Option<PathBuf>,

    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Directory for exported and automatic reports
    pub reports_dir: PathBuf,

    /// Format written automatically when a run finishes, `None` to skip
    pub auto_report: Option<ReportFormat>,

    /// Seed for synthetic data; random when unset
    pub seed: Option<u64>,

    /// Execute suites concurrently, each with its own adapter session
    pub concurrent_suites: bool,

    /// Page load budget above which navigation reports a performance bug (ms)
    pub page_load_budget_ms: u64,

    /// Average API response time considered healthy (ms)
    pub api_fast_ms: u64,

    /// Average API response time considered acceptable (ms)
    pub api_acceptable_ms: u64,

    /// Upper bound on links visited by the broken link check
    pub max_links_checked: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_ms: 10_000,
            headless: true,
            browser_executable: None,
            viewport_width: 1920,
            viewport_height: 1080,
            reports_dir: PathBuf::from("reports"),
            auto_report: Some(ReportFormat::Spreadsheet),
            seed: None,
            concurrent_suites: false,
            page_load_budget_ms: 5_000,
            api_fast_ms: 2_000,
            api_acceptable_ms: 5_000,
            max_links_checked: 10,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from `path`, or from the user config directory when
    /// no path is given and `strict-qa/config.yaml` exists there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut config = match file {
            Some(file) => {
                let content = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read config {}", file.display()))?;
                let config: HarnessConfig = serde_yaml::from_str(&content)
                    .with_context(|| format!("Invalid config {}", file.display()))?;
                log::debug!("loaded configuration from {}", file.display());
                config
            }
            None => HarnessConfig::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// Apply `QA_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("QA_HEADLESS") {
            self.headless = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("QA_REPORTS_DIR") {
            if !v.trim().is_empty() {
                self.reports_dir = PathBuf::from(v);
            }
        }
        if let Some(seed) = env_parse::<u64>("QA_SEED") {
            self.seed = Some(seed);
        }
        if let Some(ms) = env_parse::<u64>("QA_ADAPTER_TIMEOUT_MS") {
            self.adapter_timeout_ms = ms;
        }
        if let Ok(v) = std::env::var("QA_BROWSER") {
            if !v.trim().is_empty() {
                self.browser_executable = Some(PathBuf::from(v));
            }
        }
    }

    pub fn adapter_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.adapter_timeout_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("strict-qa").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.yaml");
        std::fs::write(
            &path,
            "adapter_timeout_ms: 2500\nconcurrent_suites: true\nauto_report: csv\nseed: 7\n",
        )
        .unwrap();

        let config = HarnessConfig::load(Some(&path)).unwrap();
        assert_eq!(config.adapter_timeout_ms, 2500);
        assert!(config.concurrent_suites);
        assert_eq!(config.auto_report, Some(ReportFormat::Csv));
        assert_eq!(config.viewport_width, 1920);
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.yaml");
        std::fs::write(&path, "adapter_timeout_ms: [nope").unwrap();
        assert!(HarnessConfig::load(Some(&path)).is_err());
    }
}
