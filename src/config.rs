use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Credentials;

/// Configuration file structure for DevOpsLab.
///
/// Every section is optional; command-line flags and environment variables
/// override what the file provides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// API service settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Jenkins instance and monitored jobs
    #[serde(default)]
    pub jenkins: JenkinsConfig,

    /// Terminal dashboard settings
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Port the API service listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// PostgreSQL connection string; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Seed the in-memory store with demo rows
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JenkinsConfig {
    /// Jenkins root URL
    #[serde(default = "default_jenkins_url")]
    pub url: String,

    /// Jenkins user for API token authentication
    pub user: Option<String>,

    /// Jenkins API token
    pub token: Option<String>,

    /// Jobs shown on the dashboard, in display order
    #[serde(default)]
    pub jobs: Vec<String>,

    /// Per-request timeout against Jenkins
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DashboardConfig {
    /// Base URL of the API service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Seconds between status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-request timeout against the API service
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: None,
            seed_demo_data: true,
        }
    }
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: default_jenkins_url(),
            user: None,
            token: None,
            jobs: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl JenkinsConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(self.user.as_deref(), self.token.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn default_port() -> u16 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_jenkins_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./devopslab.toml
    /// 3. ./devopslab.json
    /// 4. ./devopslab.yaml
    /// 5. ./devopslab.yml
    /// 6. `<config dir>/devopslab/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["devopslab.toml", "devopslab.json", "devopslab.yaml", "devopslab.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load_from_path(&path);
        }

        log::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Platform config location, e.g. `~/.config/devopslab/config.toml` on Linux.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("devopslab").join("config.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
