//! Sidecar configuration.
//! Reads resultd.toml from the current directory or the path in RESULTD_CONFIG;
//! RESULTD_WORKSPACE and RESULTD_LOG override the file.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_FILTER: &str = "resultd=info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Result cache directory opened at start-up.
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
fn default_page_size() -> usize {
    50
}
fn default_max_page_size() -> usize {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            log_filter: default_log_filter(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("RESULTD_CONFIG").unwrap_or_else(|_| "resultd.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(Path::new(&path))?
        } else {
            Self::default()
        };
        config.apply_env(
            std::env::var("RESULTD_WORKSPACE").ok(),
            std::env::var("RESULTD_LOG").ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        Self::from_toml(&content)
            .with_context(|| format!("failed to parse config {}", path.to_string_lossy()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self, workspace: Option<String>, log: Option<String>) {
        if let Some(ws) = workspace.filter(|s| !s.trim().is_empty()) {
            self.workspace = Some(PathBuf::from(ws));
        }
        if let Some(filter) = log.filter(|s| !s.trim().is_empty()) {
            self.log_filter = filter;
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.max_page_size == 0 {
            anyhow::bail!("max_page_size must be >= 1");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            anyhow::bail!(
                "default_page_size must be in range 1..={}",
                self.max_page_size
            );
        }
        Ok(())
    }
}
