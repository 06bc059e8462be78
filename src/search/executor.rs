use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use crate::core::config::{Config, FacetLimits};
use crate::core::error::Result;
use crate::core::types::{Record, SearchRequest, TimeRange};
use crate::query::matcher::evaluate;
use crate::search::facets::FacetAggregator;
use crate::search::results::{page_range, Distribution, GroupOutput, SearchOutput};
use crate::source::LogSource;

/// Time-boxed pull/filter/collect loop over one log source.
///
/// Each call opens its own iterator and owns all of its state, so one
/// executor can serve concurrent requests.
pub struct SearchExecutor {
    pub source: Arc<dyn LogSource>,
    pub default_timeout: Duration,
    pub max_grouped_matches: usize,
    pub facet_limits: FacetLimits,
}

/// What the shared loop reports back to both entry points
struct ScanSummary {
    searched_range: TimeRange,
    distribution: Distribution,
    pulled: u64,
    matched: u64,
}

impl SearchExecutor {
    pub fn new(source: Arc<dyn LogSource>, config: &Config) -> Self {
        SearchExecutor {
            source,
            default_timeout: config.default_timeout,
            max_grouped_matches: config.max_grouped_matches,
            facet_limits: config.facets,
        }
    }

    /// Plain search: one page of matches, `offset` matches skipped first.
    pub fn search(&self, req: &SearchRequest) -> Result<SearchOutput> {
        let span = tracing::info_span!("search", source = self.source.name());
        let _enter = span.enter();
        let started = Instant::now();

        let mut to_skip = req.offset;
        let mut remaining = req.return_limit;
        let mut records = Vec::new();

        let summary = self.scan(req, |record| {
            if to_skip > 0 {
                to_skip -= 1;
                return ControlFlow::Continue(());
            }
            if remaining == 0 {
                return ControlFlow::Break(());
            }
            records.push(record);
            remaining -= 1;
            if remaining == 0 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;

        tracing::info!(
            pulled = summary.pulled,
            matched = summary.matched,
            returned = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );

        Ok(SearchOutput {
            searched_range: summary.searched_range,
            returned_range: page_range(&records),
            records,
            distribution: summary.distribution,
        })
    }

    /// Grouped search: every match is faceted and numbered, the full match
    /// set is kept for persistence and the page is sliced out of it.
    pub fn search_and_group(&self, req: &SearchRequest) -> Result<GroupOutput> {
        let span = tracing::info_span!("search_and_group", source = self.source.name());
        let _enter = span.enter();
        let started = Instant::now();

        let mut facets = FacetAggregator::new(self.facet_limits);
        let mut matches: Vec<Record> = Vec::new();
        let mut next_id = 0u64;
        let mut truncated = false;
        let cap = self.max_grouped_matches;

        let summary = self.scan(req, |mut record| {
            record.id = next_id;
            next_id += 1;
            facets.observe(&record);

            if matches.len() < cap {
                matches.push(record);
            } else if !truncated {
                truncated = true;
                tracing::warn!(cap, "grouped match set truncated");
            }
            ControlFlow::Continue(())
        })?;

        let offset = usize::try_from(req.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(req.return_limit).unwrap_or(usize::MAX);
        let page: Vec<Record> = matches.iter().skip(offset).take(limit).cloned().collect();

        tracing::info!(
            pulled = summary.pulled,
            matched = summary.matched,
            kept = matches.len(),
            returned = page.len(),
            facets = facets.facets.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "grouped search finished"
        );

        Ok(GroupOutput {
            searched_range: summary.searched_range,
            returned_range: page_range(&page),
            page,
            facets,
            matches,
            distribution: summary.distribution,
        })
    }

    /// Pull records until the source ends, the pull cap or window end is
    /// reached, `on_match` breaks, or the deadline passes.
    ///
    /// The deadline is checked once per pulled record, before filtering. A
    /// record pulled after the deadline is still evaluated and handed to
    /// `on_match` when it matches, then the loop stops.
    fn scan<F>(&self, req: &SearchRequest, mut on_match: F) -> Result<ScanSummary>
    where
        F: FnMut(Record) -> ControlFlow<()>,
    {
        let timeout = if req.timeout.is_zero() {
            self.default_timeout
        } else {
            req.timeout
        };
        let started = Instant::now();

        let mut iter = self.source.open(req)?;
        let mut distribution = Distribution::new();
        let mut pulled = 0u64;
        let mut matched = 0u64;
        let mut last_pulled = 0u64;

        loop {
            if req.search_limit > 0 && pulled >= req.search_limit {
                break;
            }

            let Some(record) = iter.next_record()? else {
                break;
            };
            if req.range.ends_before(record.timestamp) {
                break;
            }

            pulled += 1;
            last_pulled = record.timestamp;
            let expired = started.elapsed() > timeout;

            let admitted = !req.range.starts_after(record.timestamp)
                && req
                    .condition
                    .as_ref()
                    .map_or(true, |condition| evaluate(condition, &record));

            if !admitted {
                if expired {
                    break;
                }
                continue;
            }

            matched += 1;
            distribution.record(record.timestamp);
            if on_match(record).is_break() || expired {
                break;
            }
        }

        if started.elapsed() > timeout {
            tracing::debug!(timeout_ms = timeout.as_millis() as u64, "search deadline reached");
        }
        tracing::debug!(scanned = ?iter.scanned_range(), pulled, "source scan done");

        Ok(ScanSummary {
            searched_range: TimeRange::new(req.range.start, last_pulled),
            distribution,
            pulled,
            matched,
        })
    }
}
