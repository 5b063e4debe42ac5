use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::performance::LatencyWindow;

pub type RegionKey = String;

/// Key of the routing-façade pseudo-region.
pub const GLOBAL_REGION_KEY: &str = "global";

/// One entry of the endpoint directory, as served by `/api/endpoints`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Endpoint {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Region")]
    pub region: RegionKey,
    #[serde(rename = "RegionName")]
    pub region_name: String,
    #[serde(rename = "Lat", default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f32>,
    #[serde(rename = "Lng", default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f32>,
}

/// Directory entries in discovery order.
pub type EndpointMap = Vec<Endpoint>;

/// A probe target together with its rolling latency state.
#[derive(Debug, Clone, Serialize)]
pub struct Region {
    pub key: RegionKey,
    pub label: String,
    pub probe_url: Url,
    pub lat: Option<f32>,
    pub lng: Option<f32>,
    pub latency_history: LatencyWindow,
    pub failure_count: u32,
}

impl Region {
    pub fn new(key: impl Into<RegionKey>, label: impl Into<String>, probe_url: Url, history_limit: usize) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            probe_url,
            lat: None,
            lng: None,
            latency_history: LatencyWindow::new(history_limit),
            failure_count: 0,
        }
    }

    /// Builds a region from a directory entry, appending `ping_path` to its base URL.
    pub fn from_endpoint(endpoint: &Endpoint, ping_path: &str, history_limit: usize) -> Result<Self, url::ParseError> {
        let base = endpoint.url.trim_end_matches('/');
        let path = ping_path.trim_start_matches('/');
        let probe_url = Url::parse(&format!("{base}/{path}"))?;

        let mut region = Region::new(endpoint.region.clone(), endpoint.region_name.clone(), probe_url, history_limit);
        region.lat = endpoint.lat;
        region.lng = endpoint.lng;
        Ok(region)
    }

    pub fn median(&self) -> Option<u64> {
        self.latency_history.median()
    }

    pub fn latest(&self) -> Option<u64> {
        self.latency_history.latest()
    }

    /// Appends a sample and returns the new median.
    pub fn record_sample(&mut self, latency_ms: u64) -> u64 {
        self.latency_history.push(latency_ms)
    }

    pub fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
    }

    pub fn latency_class(&self) -> LatencyClass {
        LatencyClass::of(self.median())
    }

    pub fn clear(&mut self) {
        self.latency_history.clear();
        self.failure_count = 0;
    }
}

/// Coarse latency bucket used for colouring results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyClass {
    Fast,
    Medium,
    Slow,
    Unknown,
}

impl LatencyClass {
    pub fn of(latency_ms: Option<u64>) -> Self {
        match latency_ms {
            None => LatencyClass::Unknown,
            Some(ms) if ms <= 100 => LatencyClass::Fast,
            Some(ms) if ms < 300 => LatencyClass::Medium,
            Some(_) => LatencyClass::Slow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    #[default]
    Stopped,
}

/// Progress notification broadcast to every listening surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusUpdate {
    pub status: RunStatus,
    pub completed: usize,
    pub total: usize,
}

/// A finished probe run as kept in the run history.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRun {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub results: BTreeMap<RegionKey, u64>,
}

impl ProbeRun {
    /// Identifier a run is stored under: its start time in epoch milliseconds.
    pub fn id(&self) -> i64 {
        self.start_time.timestamp_millis()
    }

    /// Lowest-latency region of the run; ties resolve to the smaller key.
    pub fn fastest(&self) -> Option<(&str, u64)> {
        self.results
            .iter()
            .min_by_key(|(_, latency)| **latency)
            .map(|(key, latency)| (key.as_str(), *latency))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}
