use std::collections::{BTreeMap, HashMap};
use crate::core::config::FacetLimits;
use crate::core::types::Record;

/// Keys backed by dedicated record attributes. Custom fields sharing one of
/// these names are not faceted separately.
const RESERVED_KEYS: [&str; 5] = ["service", "hostname", "unit", "timestamp", "msg_len"];

/// Tracking state of one facet. Transitions only go from an open state to
/// its collapsed counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetState {
    Text(HashMap<String, u64>),
    Numeric(HashMap<i64, u64>),
    /// Collapsed text facet, total frozen at collapse time
    Frozen { total: u64 },
    /// Collapsed numeric facet, keeps counting and widening
    Ranged { total: u64, min: i64, max: i64 },
}

/// Value counts of one field, bounded by a distinct-value ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    pub ceiling: usize,
    pub state: FacetState,
}

impl Facet {
    pub fn text(ceiling: usize) -> Self {
        Facet { ceiling, state: FacetState::Text(HashMap::new()) }
    }

    pub fn numeric(ceiling: usize) -> Self {
        Facet { ceiling, state: FacetState::Numeric(HashMap::new()) }
    }

    pub fn observe_text(&mut self, value: &str) {
        let FacetState::Text(counts) = &mut self.state else {
            return;
        };

        *counts.entry(value.to_string()).or_insert(0) += 1;
        if counts.len() > self.ceiling {
            let total = counts.values().sum();
            self.state = FacetState::Frozen { total };
        }
    }

    pub fn observe_number(&mut self, value: i64) {
        match &mut self.state {
            FacetState::Numeric(buckets) => {
                *buckets.entry(value).or_insert(0) += 1;
                if buckets.len() > self.ceiling {
                    let total = buckets.values().sum();
                    let min = buckets.keys().copied().min().unwrap_or(value);
                    let max = buckets.keys().copied().max().unwrap_or(value);
                    self.state = FacetState::Ranged { total, min, max };
                }
            }
            FacetState::Ranged { total, min, max } => {
                *total += 1;
                *min = (*min).min(value);
                *max = (*max).max(value);
            }
            FacetState::Text(_) | FacetState::Frozen { .. } => {}
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self.state, FacetState::Frozen { .. } | FacetState::Ranged { .. })
    }

    pub fn total(&self) -> u64 {
        match &self.state {
            FacetState::Text(counts) => counts.values().sum(),
            FacetState::Numeric(buckets) => buckets.values().sum(),
            FacetState::Frozen { total } | FacetState::Ranged { total, .. } => *total,
        }
    }

    pub fn summarize(&self, key: &str) -> FacetSummary {
        let (values, range) = match &self.state {
            FacetState::Text(counts) => (
                counts.iter().map(|(v, c)| (v.clone(), *c)).collect(),
                None,
            ),
            FacetState::Numeric(buckets) => (
                buckets.iter().map(|(v, c)| (v.to_string(), *c)).collect(),
                None,
            ),
            FacetState::Frozen { .. } => (Vec::new(), None),
            FacetState::Ranged { min, max, .. } => (Vec::new(), Some((*min, *max))),
        };

        let mut values: Vec<(String, u64)> = values;
        values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        FacetSummary {
            key: key.to_string(),
            total_count: self.total(),
            values,
            range,
        }
    }
}

/// Snapshot of one facet, as handed to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetSummary {
    pub key: String,
    pub total_count: u64,
    pub values: Vec<(String, u64)>,     // count desc, then value
    pub range: Option<(i64, i64)>,      // set once a numeric facet collapsed
}

/// Per-search facet set. Owned by one search, never shared.
#[derive(Debug, Clone)]
pub struct FacetAggregator {
    pub facets: BTreeMap<String, Facet>,
    pub limits: FacetLimits,
}

impl FacetAggregator {
    pub fn new(limits: FacetLimits) -> Self {
        let mut facets = BTreeMap::new();
        facets.insert("service".to_string(), Facet::text(limits.service));
        facets.insert("hostname".to_string(), Facet::text(limits.hostname));
        facets.insert("unit".to_string(), Facet::text(limits.unit));
        facets.insert("timestamp".to_string(), Facet::numeric(limits.numeric));
        facets.insert("msg_len".to_string(), Facet::numeric(limits.numeric));

        FacetAggregator { facets, limits }
    }

    pub fn observe(&mut self, record: &Record) {
        self.observe_text("service", &record.service);
        self.observe_text("hostname", &record.hostname);
        self.observe_text("unit", &record.unit);
        self.observe_number("timestamp", i64::try_from(record.timestamp).unwrap_or(i64::MAX));
        self.observe_number("msg_len", i64::try_from(record.msg.len()).unwrap_or(i64::MAX));

        for field in &record.fields {
            if RESERVED_KEYS.contains(&field.key.as_str()) {
                continue;
            }
            let dynamic = self.limits.dynamic;
            self.facets
                .entry(field.key.clone())
                .or_insert_with(|| Facet::text(dynamic))
                .observe_text(&field.value);
        }
    }

    fn observe_text(&mut self, key: &str, value: &str) {
        if let Some(facet) = self.facets.get_mut(key) {
            facet.observe_text(value);
        }
    }

    fn observe_number(&mut self, key: &str, value: i64) {
        if let Some(facet) = self.facets.get_mut(key) {
            facet.observe_number(value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Facet> {
        self.facets.get(key)
    }

    /// Facets in key order
    pub fn summaries(&self) -> Vec<FacetSummary> {
        self.facets
            .iter()
            .map(|(key, facet)| facet.summarize(key))
            .collect()
    }

    /// Largest total across all facets
    pub fn max_total(&self) -> u64 {
        self.facets.values().map(Facet::total).max().unwrap_or(0)
    }
}

impl Default for FacetAggregator {
    fn default() -> Self {
        FacetAggregator::new(FacetLimits::default())
    }
}
