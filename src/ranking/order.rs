use std::cmp::Ordering;

use serde::Serialize;

use crate::{
    ranking::{compare_regions, SortDirection, SortKey},
    session::RegionTable,
    RegionKey, RegionPingError, Result,
};

/// Region keys kept sorted by the active sort key and direction.
///
/// Steady-state updates go through [`ResultOrder::record_result`], which
/// re-positions one key instead of sorting the whole list again.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultOrder {
    keys: Vec<RegionKey>,
    sort_key: SortKey,
    direction: SortDirection,
}

impl ResultOrder {
    pub fn new(sort_key: SortKey, direction: SortDirection) -> Self {
        Self {
            keys: Vec::new(),
            sort_key,
            direction,
        }
    }

    pub fn keys(&self) -> &[RegionKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn remove(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.keys.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Moves `key` to the slot its current metric value belongs in.
    ///
    /// Returns the index the key was placed at.
    pub fn record_result(&mut self, key: &str, regions: &RegionTable) -> Result<usize> {
        if regions.get(key).is_none() {
            return Err(RegionPingError::UnknownRegion { key: key.to_string() });
        }

        self.remove(key);

        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            self.keys.push(key.to_string());
            return Ok(0);
        };

        if self.compare(key, first, regions) == Ordering::Less {
            self.keys.insert(0, key.to_string());
            return Ok(0);
        }

        if self.compare(key, last, regions) == Ordering::Greater {
            self.keys.push(key.to_string());
            return Ok(self.keys.len() - 1);
        }

        // The comparison is total, so there is exactly one gap between a
        // smaller and a larger neighbour.
        let slot = self
            .keys
            .partition_point(|other| self.compare(other, key, regions) == Ordering::Less);
        self.keys.insert(slot, key.to_string());
        Ok(slot)
    }

    /// Full re-sort by an arbitrary field; later `record_result` calls keep
    /// using the new key and direction.
    pub fn resort(&mut self, sort_key: SortKey, direction: SortDirection, regions: &RegionTable) {
        self.sort_key = sort_key;
        self.direction = direction;

        let mut keys = std::mem::take(&mut self.keys);
        keys.sort_by(|a, b| self.compare(a, b, regions));
        self.keys = keys;
    }

    /// First key in the order that is not `sentinel`.
    pub fn fastest_excluding(&self, sentinel: &str) -> Option<&str> {
        self.keys.iter().map(String::as_str).find(|key| *key != sentinel)
    }

    /// Up to `n` leading keys, skipping `sentinel`.
    pub fn top_excluding(&self, sentinel: &str, n: usize) -> Vec<&str> {
        self.keys
            .iter()
            .map(String::as_str)
            .filter(|key| *key != sentinel)
            .take(n)
            .collect()
    }

    /// Whether every adjacent pair is in order under the active comparator.
    pub fn is_sorted(&self, regions: &RegionTable) -> bool {
        self.keys
            .windows(2)
            .all(|pair| self.compare(&pair[0], &pair[1], regions) != Ordering::Greater)
    }

    fn compare(&self, a: &str, b: &str, regions: &RegionTable) -> Ordering {
        match (regions.entry(a), regions.entry(b)) {
            (Some(a), Some(b)) => compare_regions(a, b, self.sort_key, self.direction),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
