pub mod measure;
pub mod window;

pub use measure::{HttpProber, ProbeSample, ProbeTransport};
pub use window::{median, LatencyWindow, DEFAULT_HISTORY_LIMIT};
