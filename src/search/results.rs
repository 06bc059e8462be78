use std::collections::BTreeMap;
use crate::core::types::{Record, TimeRange};
use crate::core::utils::MICROS_PER_SEC;
use crate::search::facets::FacetAggregator;

/// Per-second match counts keyed by epoch second
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution(pub BTreeMap<u64, u64>);

impl Distribution {
    pub fn new() -> Self {
        Distribution(BTreeMap::new())
    }

    pub fn record(&mut self, ts_us: u64) {
        *self.0.entry(ts_us / MICROS_PER_SEC).or_insert(0) += 1;
    }

    /// `(second, count)` in ascending second order
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        self.0.iter().map(|(s, c)| (*s, *c)).collect()
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `[first, last]` timestamps of a page, `(0, 0)` when empty
pub fn page_range(records: &[Record]) -> TimeRange {
    match (records.first(), records.last()) {
        (Some(first), Some(last)) => TimeRange::new(first.timestamp, last.timestamp),
        _ => TimeRange::UNSET,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutput {
    pub searched_range: TimeRange,
    pub returned_range: TimeRange,
    pub records: Vec<Record>,
    pub distribution: Distribution,
}

#[derive(Debug, Clone)]
pub struct GroupOutput {
    pub searched_range: TimeRange,
    pub returned_range: TimeRange,
    pub page: Vec<Record>,
    pub facets: FacetAggregator,
    pub matches: Vec<Record>,   // full match set in match order, ids assigned
    pub distribution: Distribution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_buckets() {
        let mut dist = Distribution::new();
        dist.record(10_000_000);
        dist.record(10_999_999);
        dist.record(3_000_000);
        assert_eq!(dist.buckets(), vec![(3, 1), (10, 2)]);
        assert_eq!(dist.total(), 3);
    }

    #[test]
    fn test_page_range() {
        assert_eq!(page_range(&[]), TimeRange::UNSET);
        let page = vec![Record::new(5, "a"), Record::new(9, "b")];
        assert_eq!(page_range(&page), TimeRange::new(5, 9));
    }
}
