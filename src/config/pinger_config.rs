use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{performance::DEFAULT_HISTORY_LIMIT, LogLevel, Result, GLOBAL_REGION_KEY};

pub const DEFAULT_ENDPOINTS_URL: &str = "https://gcping.com/api/endpoints";
pub const DEFAULT_PING_PATH: &str = "/api/ping";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PingerConfig {
    pub endpoints_url: String,
    pub ping_path: String,
    pub global_region_key: String,
    pub initial_iterations: u32,
    pub history_limit: usize,
    pub probe_timeout_ms: u64,
    pub retry: RetrySettings,
    pub refresh_interval_secs: u64,
    pub auto_start: bool,
    pub log_level: LogLevel,
}

impl Default for PingerConfig {
    fn default() -> Self {
        Self {
            endpoints_url: DEFAULT_ENDPOINTS_URL.to_string(),
            ping_path: DEFAULT_PING_PATH.to_string(),
            global_region_key: GLOBAL_REGION_KEY.to_string(),
            initial_iterations: 10,
            history_limit: DEFAULT_HISTORY_LIMIT,
            probe_timeout_ms: 5000,
            retry: RetrySettings::default(),
            refresh_interval_secs: 3600,
            auto_start: true,
            log_level: LogLevel::Info,
        }
    }
}

impl PingerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per probe, including the first one.
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            retry_count: 1,
            retry_delay_ms: 250,
        }
    }
}
