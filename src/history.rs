use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{ProbeRun, RegionPingError, Result};

const RUNS_KEY: &str = "runs";

fn run_key(id: i64) -> String {
    format!("run-{id}")
}

/// Append-only storage of finished probe runs.
///
/// Runs are identified by their start time in epoch milliseconds.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Start timestamps of every stored run, oldest first.
    async fn run_ids(&self) -> Result<Vec<i64>>;

    async fn load_run(&self, id: i64) -> Result<Option<ProbeRun>>;

    async fn append_run(&self, run: &ProbeRun) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryRunStore {
    runs: parking_lot::Mutex<Vec<ProbeRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn run_ids(&self) -> Result<Vec<i64>> {
        Ok(self.runs.lock().iter().map(ProbeRun::id).collect())
    }

    async fn load_run(&self, id: i64) -> Result<Option<ProbeRun>> {
        Ok(self.runs.lock().iter().find(|run| run.id() == id).cloned())
    }

    async fn append_run(&self, run: &ProbeRun) -> Result<()> {
        self.runs.lock().push(run.clone());
        Ok(())
    }
}

/// Keeps all runs in one JSON document shaped like a key-value store:
/// `"runs"` holds the list of ids and each run lives under `"run-<id>"`.
#[derive(Debug)]
pub struct FileRunStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileRunStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(Map::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

fn ids_from(document: &Map<String, Value>) -> Result<Vec<i64>> {
    match document.get(RUNS_KEY) {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| RegionPingError::Storage(format!("malformed run index: {e}"))),
    }
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn run_ids(&self) -> Result<Vec<i64>> {
        let document = self.read_document().await?;
        ids_from(&document)
    }

    async fn load_run(&self, id: i64) -> Result<Option<ProbeRun>> {
        let document = self.read_document().await?;
        match document.get(&run_key(id)) {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    async fn append_run(&self, run: &ProbeRun) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read_document().await?;
        let mut ids = ids_from(&document)?;
        ids.push(run.id());

        document.insert(RUNS_KEY.to_string(), serde_json::to_value(&ids)?);
        document.insert(run_key(run.id()), serde_json::to_value(run)?);
        self.write_document(&document).await
    }
}

/// Summary row for one stored run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: i64,
    pub fastest_region: Option<String>,
    pub fastest_latency_ms: Option<u64>,
}

/// Read/write facade over a [`RunStore`] that never fails: storage errors
/// are logged and reads fall back to empty results.
#[derive(Clone)]
pub struct RunHistory {
    store: Arc<dyn RunStore>,
}

impl RunHistory {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRunStore::new()))
    }

    pub async fn record(&self, run: &ProbeRun) -> bool {
        match self.store.append_run(run).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(run_id = run.id(), error = %e, "failed to save probe run");
                false
            }
        }
    }

    pub async fn run_ids(&self) -> Vec<i64> {
        self.store.run_ids().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read run index");
            Vec::new()
        })
    }

    pub async fn run(&self, id: i64) -> Option<ProbeRun> {
        self.store.load_run(id).await.unwrap_or_else(|e| {
            tracing::warn!(run_id = id, error = %e, "failed to read probe run");
            None
        })
    }

    /// Every stored run with its fastest region, oldest first.
    pub async fn summaries(&self) -> Vec<RunSummary> {
        let mut summaries = Vec::new();
        for id in self.run_ids().await {
            let fastest = self.run(id).await.and_then(|run| {
                run.fastest().map(|(region, latency)| (region.to_string(), latency))
            });
            summaries.push(RunSummary {
                run_id: id,
                fastest_region: fastest.as_ref().map(|(region, _)| region.clone()),
                fastest_latency_ms: fastest.map(|(_, latency)| latency),
            });
        }
        summaries
    }
}

impl std::fmt::Debug for RunHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHistory").finish_non_exhaustive()
    }
}
