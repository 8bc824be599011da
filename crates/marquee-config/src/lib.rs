// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Current user, used to recognise requests the user made themselves.
    pub user_id: Option<i64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5055".to_string(),
            api_key: None,
            timeout_secs: 30,
            user_id: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub completion_dismiss_ms: u64,
    pub search_debounce_ms: u64,
    pub default_search_limit: usize,
    pub poll_interval_secs: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            completion_dismiss_ms: 2500,
            search_debounce_ms: 500,
            default_search_limit: 100,
            poll_interval_secs: 5,
        }
    }
}

impl AcquisitionConfig {
    pub fn completion_dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.completion_dismiss_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub backend: BackendConfig,
    pub acquisition: AcquisitionConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: MARQUEE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("MARQUEE_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", base_url = %config.backend.base_url, "configuration loaded");
    Ok(config)
}
