pub mod config;
pub mod directory;
pub mod error;
pub mod handler;
pub mod history;
pub mod performance;
pub mod ranking;
pub mod session;
pub mod types;

// Re-export commonly used items
pub use error::{RegionPingError, Result};
pub use handler::{CycleSummary, RegionPinger, RunControl};
pub use types::{
    Endpoint, EndpointMap, LatencyClass, LogLevel, ProbeRun, Region, RegionKey, RunStatus, StatusUpdate,
    GLOBAL_REGION_KEY,
};
pub use config::{resolve_config, NormalizedConfig, PingerConfig, RetrySettings};
pub use history::{FileRunStore, MemoryRunStore, RunHistory, RunStore};
pub use performance::{HttpProber, ProbeSample, ProbeTransport};
pub use ranking::{ResultOrder, SortDirection, SortKey};
pub use session::{RegionTable, Session};
