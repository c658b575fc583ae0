//! Configuration types for the agro dashboard

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable carrying the backend base address
pub const API_URL_ENV: &str = "AGRO_API_URL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base address shared by the real-time channel and the REST commands
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub subscriber: SubscriberConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            subscriber: SubscriberConfig::default(),
            demo: DemoConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Config {
    /// Apply the `AGRO_API_URL` environment variable, if set
    pub fn apply_env(&mut self) {
        self.override_api_url(std::env::var(API_URL_ENV).ok());
    }

    /// Replace the base address when `value` is present and non-blank
    pub fn override_api_url(&mut self, value: Option<String>) {
        if let Some(url) = value {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                tracing::debug!("Using backend address {}", trimmed);
                self.api_url = trimmed.to_string();
            }
        }
    }

    /// Base address without trailing slashes
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

/// Live status subscription settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_event_name")]
    pub event_name: String,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            event_name: default_event_name(),
        }
    }
}

/// Synthetic demonstration view settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_demo_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_demo_interval(),
            history_size: default_history_size(),
        }
    }
}

/// Dashboard HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_dashboard_port(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_event_name() -> String {
    "sensorData".to_string()
}

fn default_true() -> bool {
    true
}

fn default_demo_interval() -> u64 {
    2000
}

fn default_history_size() -> usize {
    20
}

fn default_dashboard_port() -> u16 {
    11120
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::DashboardError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
