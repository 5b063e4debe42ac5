pub mod pinger_config;
pub mod resolve_config;

pub use pinger_config::{PingerConfig, RetrySettings, DEFAULT_ENDPOINTS_URL, DEFAULT_PING_PATH};
pub use resolve_config::{resolve_config, NormalizedConfig, RetryConfig, SettingsConfig};
