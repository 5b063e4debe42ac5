use std::time::Duration;

use crate::config::PingerConfig;
use crate::LogLevel;

#[derive(Debug, Clone)]
pub struct NormalizedConfig {
    /// Where the endpoint directory is fetched from
    pub endpoints_url: String,
    /// Path appended to each endpoint URL to form its probe URL
    pub ping_path: String,
    /// Key of the routing-façade region
    pub global_region_key: String,
    /// Iterations run by `bootstrap` when auto start is enabled
    pub initial_iterations: u32,
    /// Samples kept per region
    pub history_limit: usize,
    pub auto_start: bool,
    pub log_level: LogLevel,
    pub retry: RetryConfig,
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts per probe, never below one
    pub retry_count: u32,
    /// Base delay between attempts, scaled by the attempt number
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: 1,
            retry_delay: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsConfig {
    /// Timeout for a single probe attempt
    pub probe_timeout: Duration,
    /// Period of the background directory refresh
    pub refresh_interval: Duration,
}

pub fn resolve_config(config: PingerConfig) -> NormalizedConfig {
    NormalizedConfig {
        endpoints_url: config.endpoints_url,
        ping_path: config.ping_path,
        global_region_key: config.global_region_key,
        initial_iterations: config.initial_iterations,
        history_limit: config.history_limit.max(1),
        auto_start: config.auto_start,
        log_level: config.log_level,
        retry: RetryConfig {
            retry_count: config.retry.retry_count.max(1),
            retry_delay: Duration::from_millis(config.retry.retry_delay_ms),
        },
        settings: SettingsConfig {
            probe_timeout: Duration::from_millis(config.probe_timeout_ms.max(1)),
            refresh_interval: Duration::from_secs(config.refresh_interval_secs.max(1)),
        },
    }
}
