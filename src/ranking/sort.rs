use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::Region;

/// Field a result order is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Median,
    /// Most recent sample rather than the median.
    Latest,
    Label,
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "median" | "latency" => Ok(SortKey::Median),
            "latest" => Ok(SortKey::Latest),
            "label" | "name" => Ok(SortKey::Label),
            "key" | "region" => Ok(SortKey::Key),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Orders two regions by `sort_key` under `direction`.
///
/// `a_index` and `b_index` are discovery positions; they break ties so the
/// comparison is total and equal values keep discovery order in either
/// direction. Regions without a latency value rank after every region that
/// has one.
pub fn compare_regions(
    (a_index, a): (usize, &Region),
    (b_index, b): (usize, &Region),
    sort_key: SortKey,
    direction: SortDirection,
) -> Ordering {
    let primary = match sort_key {
        SortKey::Median => compare_latency(a.median(), b.median(), direction),
        SortKey::Latest => compare_latency(a.latest(), b.latest(), direction),
        SortKey::Label => direction.apply(a.label.cmp(&b.label)),
        SortKey::Key => direction.apply(a.key.cmp(&b.key)),
    };

    primary.then(a_index.cmp(&b_index))
}

fn compare_latency(a: Option<u64>, b: Option<u64>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
