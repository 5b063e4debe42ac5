use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{Endpoint, EndpointMap, RegionPingError, Result};

/// Well-known regions, used when no directory service is reachable.
static DEFAULT_ENDPOINTS: LazyLock<EndpointMap> = LazyLock::new(|| {
    [
        ("global", "Global HTTP Load Balancer", "https://global.gcping.com", None),
        ("asia-east1", "Taiwan", "https://asia-east1-5tkroniexa-de.a.run.app", Some((23.69781, 120.960515))),
        ("asia-northeast1", "Tokyo", "https://asia-northeast1-5tkroniexa-an.a.run.app", Some((35.6761919, 139.6503106))),
        ("asia-south1", "Mumbai", "https://asia-south1-5tkroniexa-el.a.run.app", Some((19.0759837, 72.8776559))),
        ("asia-southeast1", "Singapore", "https://asia-southeast1-5tkroniexa-as.a.run.app", Some((1.352083, 103.819836))),
        ("australia-southeast1", "Sydney", "https://australia-southeast1-5tkroniexa-ts.a.run.app", Some((-33.8688197, 151.2092955))),
        ("europe-north1", "Finland", "https://europe-north1-5tkroniexa-lz.a.run.app", Some((61.92411, 25.7481511))),
        ("europe-west1", "Belgium", "https://europe-west1-5tkroniexa-ew.a.run.app", Some((50.503887, 4.469936))),
        ("europe-west2", "London", "https://europe-west2-5tkroniexa-nw.a.run.app", Some((51.5073509, -0.1277583))),
        ("europe-west3", "Frankfurt", "https://europe-west3-5tkroniexa-ey.a.run.app", Some((50.1109221, 8.6821267))),
        ("northamerica-northeast1", "Montréal", "https://northamerica-northeast1-5tkroniexa-nn.a.run.app", Some((45.5016889, -73.567256))),
        ("southamerica-east1", "São Paulo", "https://southamerica-east1-5tkroniexa-rj.a.run.app", Some((-21.2922457, -50.3428431))),
        ("us-central1", "Iowa", "https://us-central1-5tkroniexa-uc.a.run.app", Some((41.8780025, -93.097702))),
        ("us-east1", "South Carolina", "https://us-east1-5tkroniexa-ue.a.run.app", Some((33.836081, -81.1637245))),
        ("us-east4", "North Virginia", "https://us-east4-5tkroniexa-uk.a.run.app", Some((32.817108, -96.949448))),
        ("us-west1", "Oregon", "https://us-west1-5tkroniexa-uw.a.run.app", Some((34.0522342, -118.2436849))),
        ("us-west2", "Los Angeles", "https://us-west2-5tkroniexa-wl.a.run.app", Some((34.0522342, -118.2436849))),
    ]
    .into_iter()
    .map(|(region, name, url, coords): (&str, &str, &str, Option<(f32, f32)>)| Endpoint {
        url: url.to_string(),
        region: region.to_string(),
        region_name: name.to_string(),
        lat: coords.map(|(lat, _)| lat),
        lng: coords.map(|(_, lng)| lng),
    })
    .collect()
});

pub fn default_endpoints() -> EndpointMap {
    DEFAULT_ENDPOINTS.clone()
}

/// Parses a directory document, keeping the order entries appear in.
///
/// An entry without a `Region` field falls back to its object key.
pub fn parse_endpoints(raw: &str) -> Result<EndpointMap> {
    let document: Map<String, Value> = serde_json::from_str(raw)?;

    let mut endpoints = Vec::with_capacity(document.len());
    for (key, value) in document {
        let mut endpoint: Endpoint = serde_json::from_value(with_region_fallback(value, &key))?;
        if endpoint.region.is_empty() {
            endpoint.region = key;
        }
        endpoints.push(endpoint);
    }

    if endpoints.is_empty() {
        return Err(RegionPingError::EmptyDirectory);
    }
    Ok(endpoints)
}

fn with_region_fallback(mut value: Value, key: &str) -> Value {
    if let Value::Object(fields) = &mut value {
        fields
            .entry("Region")
            .or_insert_with(|| Value::String(key.to_string()));
    }
    value
}

/// `GET`s the endpoint directory. Every failure is reported as
/// [`RegionPingError::DirectoryUnavailable`] except an empty document.
pub async fn fetch_endpoints(client: &reqwest::Client, url: &str) -> Result<EndpointMap> {
    let unavailable = |reason: String| RegionPingError::DirectoryUnavailable {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(unavailable(format!("status {}", response.status())));
    }

    let body = response.text().await.map_err(|e| unavailable(e.to_string()))?;

    match parse_endpoints(&body) {
        Ok(endpoints) => Ok(endpoints),
        Err(RegionPingError::EmptyDirectory) => Err(RegionPingError::EmptyDirectory),
        Err(e) => Err(unavailable(e.to_string())),
    }
}

/// Last known endpoint directory, shared between the refresh task and runs.
///
/// Runs take a snapshot at start; a refresh landing mid-run only affects the
/// next run.
#[derive(Debug, Clone, Default)]
pub struct DirectoryCache {
    inner: Arc<parking_lot::RwLock<Option<EndpointMap>>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<EndpointMap> {
        self.inner.read().clone()
    }

    pub fn store(&self, endpoints: EndpointMap) {
        *self.inner.write() = Some(endpoints);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_none()
    }

    /// Fetches and stores the directory, returning the fresh copy.
    pub async fn refresh(&self, client: &reqwest::Client, url: &str) -> Result<EndpointMap> {
        let endpoints = fetch_endpoints(client, url).await?;
        tracing::debug!(url = %url, regions = endpoints.len(), "endpoint directory refreshed");
        self.store(endpoints.clone());
        Ok(endpoints)
    }
}

/// Refreshes `cache` every `interval` until `token` is cancelled. The first
/// refresh happens immediately; failures keep the previous directory.
pub fn spawn_refresh(
    cache: DirectoryCache,
    client: reqwest::Client,
    url: String,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("directory refresh task cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = cache.refresh(&client, &url).await {
                        tracing::warn!(url = %url, error = %e, "endpoint directory refresh failed");
                    }
                }
            }
        }
    })
}
