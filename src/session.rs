use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::{
    ranking::{ResultOrder, SortDirection, SortKey},
    Endpoint, Region, RegionKey, RegionPingError, Result,
};

/// Regions in discovery order with key lookup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegionTable {
    regions: Vec<Region>,
    #[serde(skip)]
    index: HashMap<RegionKey, usize>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a region. A key seen before keeps its discovery position and
    /// takes the new definition; returns `true` in that case.
    pub fn insert(&mut self, region: Region) -> bool {
        match self.index.get(&region.key) {
            Some(&idx) => {
                self.regions[idx] = region;
                true
            }
            None => {
                self.index.insert(region.key.clone(), self.regions.len());
                self.regions.push(region);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Region> {
        self.index.get(key).map(|&idx| &self.regions[idx])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Region> {
        self.index.get(key).map(|&idx| &mut self.regions[idx])
    }

    /// Region with its discovery position.
    pub fn entry(&self, key: &str) -> Option<(usize, &Region)> {
        self.index.get(key).map(|&idx| (idx, &self.regions[idx]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Region> {
        self.regions.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Everything one probing session owns: the regions, the ranked order and
/// the routing target reported by the global region.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    regions: RegionTable,
    order: ResultOrder,
    global_region_key: String,
    routing_target: Option<String>,
    fastest_visible: bool,
}

impl Session {
    pub fn new(global_region_key: impl Into<String>) -> Self {
        Self {
            regions: RegionTable::new(),
            order: ResultOrder::default(),
            global_region_key: global_region_key.into(),
            routing_target: None,
            fastest_visible: false,
        }
    }

    pub fn from_endpoints(
        endpoints: &[Endpoint],
        ping_path: &str,
        history_limit: usize,
        global_region_key: impl Into<String>,
    ) -> Result<Self> {
        let mut session = Session::new(global_region_key);
        for endpoint in endpoints {
            match Region::from_endpoint(endpoint, ping_path, history_limit) {
                Ok(region) => {
                    session.insert_region(region);
                }
                Err(e) => tracing::warn!(
                    region = %endpoint.region,
                    url = %endpoint.url,
                    error = %e,
                    "skipping endpoint with invalid URL"
                ),
            }
        }

        if session.regions.is_empty() {
            return Err(RegionPingError::EmptyDirectory);
        }
        Ok(session)
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn region(&self, key: &str) -> Option<&Region> {
        self.regions.get(key)
    }

    /// Adds or replaces a region. A replaced region starts over without
    /// samples, so it leaves the order until it records one.
    pub fn insert_region(&mut self, region: Region) {
        let key = region.key.clone();
        if self.regions.insert(region) {
            self.order.remove(&key);
        }
    }

    pub fn order(&self) -> &ResultOrder {
        &self.order
    }

    pub fn global_region_key(&self) -> &str {
        &self.global_region_key
    }

    pub fn routing_target(&self) -> Option<&str> {
        self.routing_target.as_deref()
    }

    pub fn set_routing_target(&mut self, target: Option<String>) {
        self.routing_target = target;
    }

    pub fn fastest_visible(&self) -> bool {
        self.fastest_visible
    }

    pub fn mark_fastest_visible(&mut self) {
        self.fastest_visible = true;
    }

    /// Appends a sample to the region's history and re-positions it in the order.
    pub fn record_sample(&mut self, key: &str, latency_ms: u64) -> Result<u64> {
        let region = self
            .regions
            .get_mut(key)
            .ok_or_else(|| RegionPingError::UnknownRegion { key: key.to_string() })?;
        let median = region.record_sample(latency_ms);

        self.order.record_result(key, &self.regions)?;
        Ok(median)
    }

    pub fn record_failure(&mut self, key: &str) -> Result<()> {
        let region = self
            .regions
            .get_mut(key)
            .ok_or_else(|| RegionPingError::UnknownRegion { key: key.to_string() })?;
        region.record_failure();
        Ok(())
    }

    pub fn resort(&mut self, sort_key: SortKey, direction: SortDirection) {
        self.order.resort(sort_key, direction, &self.regions);
    }

    /// Best real region, skipping the routing façade.
    pub fn fastest_region(&self) -> Option<&Region> {
        self.order
            .fastest_excluding(&self.global_region_key)
            .and_then(|key| self.regions.get(key))
    }

    /// Leading regions of the order, skipping the routing façade.
    pub fn top_regions(&self, n: usize) -> Vec<&Region> {
        self.order
            .top_excluding(&self.global_region_key, n)
            .into_iter()
            .filter_map(|key| self.regions.get(key))
            .collect()
    }

    /// Regions in the current ranked order.
    pub fn ranked(&self) -> impl Iterator<Item = &Region> {
        self.order.keys().iter().filter_map(|key| self.regions.get(key))
    }

    /// Current median of every region that has one.
    pub fn medians(&self) -> BTreeMap<RegionKey, u64> {
        self.regions
            .iter()
            .filter_map(|r| r.median().map(|m| (r.key.clone(), m)))
            .collect()
    }

    /// Drops all samples and rebuilds an empty order, keeping the regions
    /// and the active sort settings.
    pub fn reset(&mut self) {
        for region in self.regions.iter_mut() {
            region.clear();
        }
        self.order = ResultOrder::new(self.order.sort_key(), self.order.direction());
        self.routing_target = None;
        self.fastest_visible = false;
    }
}
