use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of samples kept per region unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Middle element of the numerically sorted samples, index `floor(n / 2)`.
///
/// Returns `None` for an empty slice.
pub fn median(samples: &[u64]) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    Some(sorted[sorted.len() / 2])
}

/// Rolling window of the most recent latency samples for one region.
///
/// The oldest sample is evicted first once `limit` is reached, and the
/// median is recomputed on every push so readers never see a stale value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LatencyWindow {
    limit: usize,
    samples: VecDeque<u64>,
    median: Option<u64>,
}

impl LatencyWindow {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            samples: VecDeque::with_capacity(limit),
            median: None,
        }
    }

    pub fn push(&mut self, latency_ms: u64) -> u64 {
        if self.samples.len() == self.limit {
            self.samples.pop_front();
        }
        self.samples.push_back(latency_ms);

        let current = median(self.samples.make_contiguous()).unwrap_or(latency_ms);
        self.median = Some(current);
        current
    }

    pub fn median(&self) -> Option<u64> {
        self.median
    }

    /// Most recently pushed sample.
    pub fn latest(&self) -> Option<u64> {
        self.samples.back().copied()
    }

    pub fn samples(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.median = None;
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
