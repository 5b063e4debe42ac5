use std::sync::Arc;

use chrono::Utc;
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{resolve_config, NormalizedConfig, PingerConfig},
    directory::{self, DirectoryCache},
    history::RunHistory,
    performance::{HttpProber, ProbeTransport},
    ranking::{SortDirection, SortKey},
    session::Session,
    Endpoint, LogLevel, ProbeRun, Region, RegionKey, RegionPingError, Result, RunStatus, StatusUpdate,
};

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Shared run-status flag plus the channel progress updates are broadcast on.
///
/// Clones observe and control the same run. A stop request only takes effect
/// at the next check point, before the next region is probed.
#[derive(Debug, Clone)]
pub struct RunControl {
    current: Arc<parking_lot::RwLock<StatusUpdate>>,
    updates: broadcast::Sender<StatusUpdate>,
}

impl RunControl {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            current: Arc::new(parking_lot::RwLock::new(StatusUpdate {
                status: RunStatus::Stopped,
                completed: 0,
                total: 0,
            })),
            updates,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.current.read().status
    }

    pub fn current(&self) -> StatusUpdate {
        *self.current.read()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.updates.subscribe()
    }

    pub fn request_stop(&self) {
        self.publish(StatusUpdate {
            status: RunStatus::Stopped,
            completed: 0,
            total: 0,
        });
    }

    fn begin(&self, total: usize) {
        self.publish(StatusUpdate {
            status: RunStatus::Running,
            completed: 0,
            total,
        });
    }

    fn advance(&self) {
        let update = {
            let mut current = self.current.write();
            if current.status != RunStatus::Running {
                return;
            }
            current.completed += 1;
            *current
        };
        let _ = self.updates.send(update);
    }

    fn finish(&self) {
        let total = self.current.read().total;
        self.publish(StatusUpdate {
            status: RunStatus::Stopped,
            completed: total,
            total,
        });
    }

    fn publish(&self, update: StatusUpdate) {
        *self.current.write() = update;
        // no subscribers is fine
        let _ = self.updates.send(update);
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts the status back to stopped when a cycle is abandoned mid-way, e.g.
/// when the `start` future is dropped or a probe panics.
struct CycleGuard {
    control: RunControl,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if self.control.status() == RunStatus::Running {
            tracing::warn!("probe run abandoned before completion");
            self.control.request_stop();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub probes_completed: usize,
    pub probes_failed: usize,
    pub stopped_early: bool,
}

/// Drives probe cycles over a [`Session`] and keeps its ranking current.
///
/// Probes run strictly one at a time in discovery order.
pub struct RegionPinger {
    config: NormalizedConfig,
    session: Session,
    transport: Arc<dyn ProbeTransport>,
    client: reqwest::Client,
    directory: DirectoryCache,
    history: Option<RunHistory>,
    control: RunControl,
}

impl RegionPinger {
    pub fn new(config: Option<PingerConfig>) -> Self {
        let config = resolve_config(config.unwrap_or_default());
        let client = reqwest::Client::new();
        let transport = Arc::new(HttpProber::from_config(&config).with_client(client.clone()));
        Self::build(config, transport, client)
    }

    pub fn with_transport(config: Option<PingerConfig>, transport: Arc<dyn ProbeTransport>) -> Self {
        Self::build(resolve_config(config.unwrap_or_default()), transport, reqwest::Client::new())
    }

    fn build(config: NormalizedConfig, transport: Arc<dyn ProbeTransport>, client: reqwest::Client) -> Self {
        Self {
            session: Session::new(config.global_region_key.clone()),
            config,
            transport,
            client,
            directory: DirectoryCache::new(),
            history: None,
            control: RunControl::new(),
        }
    }

    pub fn with_history(mut self, history: RunHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_directory(mut self, directory: DirectoryCache) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    pub fn config(&self) -> &NormalizedConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn status(&self) -> RunStatus {
        self.control.status()
    }

    pub fn directory(&self) -> &DirectoryCache {
        &self.directory
    }

    pub fn history(&self) -> Option<&RunHistory> {
        self.history.as_ref()
    }

    /// Replaces the session with one built from `endpoints`, keeping the
    /// active sort settings.
    pub fn load_endpoints(&mut self, endpoints: &[Endpoint]) -> Result<usize> {
        let mut session = Session::from_endpoints(
            endpoints,
            &self.config.ping_path,
            self.config.history_limit,
            self.config.global_region_key.clone(),
        )?;
        session.resort(self.session.order().sort_key(), self.session.order().direction());

        self.session = session;
        Ok(self.session.regions().len())
    }

    pub fn add_region(&mut self, region: Region) {
        self.session.insert_region(region);
    }

    /// Loads regions from the directory cache, fetching the directory when
    /// it has never been loaded.
    pub async fn load_regions(&mut self) -> Result<usize> {
        let endpoints = match self.directory.snapshot() {
            Some(endpoints) => endpoints,
            None => self
                .directory
                .refresh(&self.client, &self.config.endpoints_url)
                .await
                .inspect_err(|e| tracing::error!(error = %e, "could not load regions"))?,
        };

        let loaded = self.load_endpoints(&endpoints)?;
        tracing::info!(regions = loaded, "regions loaded");
        Ok(loaded)
    }

    /// Keeps the directory cache fresh every `refresh_interval` until `token`
    /// is cancelled. Regions already loaded are not touched; the next
    /// [`RegionPinger::load_regions`] picks up the refreshed directory.
    pub fn spawn_directory_refresh(&self, token: CancellationToken) -> JoinHandle<()> {
        directory::spawn_refresh(
            self.directory.clone(),
            self.client.clone(),
            self.config.endpoints_url.clone(),
            self.config.settings.refresh_interval,
            token,
        )
    }

    /// Loads regions and, when auto start is configured, runs the initial
    /// iterations.
    pub async fn bootstrap(&mut self) -> Result<Option<CycleSummary>> {
        self.load_regions().await?;
        if !self.config.auto_start {
            return Ok(None);
        }
        let iterations = self.config.initial_iterations;
        self.start(iterations).await.map(Some)
    }

    /// Moves the status to running and probes every region `iterations` times.
    pub async fn start(&mut self, iterations: u32) -> Result<CycleSummary> {
        if self.control.status() == RunStatus::Running {
            return Err(RegionPingError::AlreadyRunning);
        }
        if self.session.regions().is_empty() {
            return Err(RegionPingError::NoRegions);
        }

        self.control
            .begin(iterations as usize * self.session.regions().len());
        let _guard = CycleGuard {
            control: self.control.clone(),
        };
        Ok(self.run_cycle(iterations).await)
    }

    /// Clears all results and starts again.
    pub async fn rerun(&mut self, iterations: u32) -> Result<CycleSummary> {
        self.reset();
        self.start(iterations).await
    }

    pub fn stop(&self) {
        self.control.request_stop();
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn resort(&mut self, sort_key: SortKey, direction: SortDirection) {
        self.session.resort(sort_key, direction);
    }

    pub fn fastest_region(&self) -> Option<&Region> {
        self.session.fastest_region()
    }

    pub fn routing_target(&self) -> Option<&str> {
        self.session.routing_target()
    }

    /// Probes each region in discovery order, `iterations` times over.
    ///
    /// The run status is checked before every probe; once it reads stopped
    /// the cycle returns without touching the remaining regions. A probe that
    /// already started always completes and is recorded.
    pub async fn run_cycle(&mut self, iterations: u32) -> CycleSummary {
        let keys: Vec<RegionKey> = self.session.regions().keys().map(str::to_string).collect();
        let started_at = Utc::now();
        let mut summary = CycleSummary::default();

        'cycle: for _ in 0..iterations {
            for key in &keys {
                if self.control.status() == RunStatus::Stopped {
                    summary.stopped_early = true;
                    break 'cycle;
                }

                self.probe_and_record(key, &mut summary).await;
                self.control.advance();
            }

            self.session.mark_fastest_visible();
        }

        // a stop that arrived during the last probe
        if self.control.status() == RunStatus::Stopped {
            summary.stopped_early = true;
        }

        if summary.stopped_early {
            tracing::info!(
                completed = summary.probes_completed,
                failed = summary.probes_failed,
                "probe run stopped"
            );
            return summary;
        }

        self.control.finish();
        tracing::info!(
            completed = summary.probes_completed,
            failed = summary.probes_failed,
            "probe run complete"
        );

        if let Some(history) = &self.history {
            let run = ProbeRun {
                start_time: started_at,
                end_time: Utc::now(),
                results: self.session.medians(),
            };
            history.record(&run).await;
        }

        summary
    }

    async fn probe_and_record(&mut self, key: &str, summary: &mut CycleSummary) {
        let Some(region) = self.session.region(key) else {
            return;
        };

        let outcome = self.transport.probe(region).await;

        match outcome {
            Ok(sample) => {
                if key == self.session.global_region_key() {
                    if let Some(target) = sample.routed_to {
                        self.session.set_routing_target(Some(target));
                    }
                }

                match self.session.record_sample(key, sample.latency_ms) {
                    Ok(median) => {
                        summary.probes_completed += 1;
                        self.log(key, sample.latency_ms, median);
                    }
                    Err(e) => tracing::warn!(region = %key, error = %e, "could not record sample"),
                }
            }
            Err(e) => {
                summary.probes_failed += 1;
                tracing::warn!(region = %key, error = %e, "probe failed, no sample this round");
                if let Err(e) = self.session.record_failure(key) {
                    tracing::warn!(region = %key, error = %e, "could not record failure");
                }
            }
        }
    }

    fn log(&self, key: &str, latency_ms: u64, median: u64) {
        let msg = "probe recorded";
        match self.config.log_level {
            LogLevel::Error => tracing::error!(region = %key, latency_ms, median_ms = median, "{msg}"),
            LogLevel::Warn => tracing::warn!(region = %key, latency_ms, median_ms = median, "{msg}"),
            LogLevel::Info => tracing::info!(region = %key, latency_ms, median_ms = median, "{msg}"),
            LogLevel::Debug => tracing::debug!(region = %key, latency_ms, median_ms = median, "{msg}"),
            LogLevel::Trace => tracing::trace!(region = %key, latency_ms, median_ms = median, "{msg}"),
        }
    }
}
