use std::sync::Arc;
use std::thread;
use std::time::Duration;
use log_indexer::core::config::Config;
use log_indexer::core::error::Result;
use log_indexer::core::types::{Record, SearchRequest, TimeRange};
use log_indexer::query::ast::{ConditionNode, Predicate};
use log_indexer::search::executor::SearchExecutor;
use log_indexer::source::memory::MemorySource;
use log_indexer::source::{LogIterator, LogSource};

const SEC: u64 = 1_000_000;

/// Hands out every record regardless of window or limits
struct RawSource {
    records: Vec<Record>,
    delay: Duration,
}

struct RawIterator {
    records: std::vec::IntoIter<Record>,
    delay: Duration,
    last: u64,
}

impl LogSource for RawSource {
    fn name(&self) -> &str {
        "raw"
    }

    fn open(&self, _request: &SearchRequest) -> Result<Box<dyn LogIterator>> {
        Ok(Box::new(RawIterator {
            records: self.records.clone().into_iter(),
            delay: self.delay,
            last: 0,
        }))
    }
}

impl LogIterator for RawIterator {
    fn next_record(&mut self) -> Result<Option<Record>> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let next = self.records.next();
        if let Some(record) = &next {
            self.last = record.timestamp;
        }
        Ok(next)
    }

    fn scanned_range(&self) -> TimeRange {
        TimeRange::new(0, self.last)
    }

    fn all_available_range(&self) -> Result<TimeRange> {
        Ok(TimeRange::UNSET)
    }
}

fn services() -> Vec<Record> {
    ["a", "a", "b", "b", "c"]
        .iter()
        .enumerate()
        .map(|(i, service)| Record::new((i as u64 + 1) * 10 * SEC, format!("m{}", i)).with_service(*service))
        .collect()
}

fn numbered(n: u64) -> Vec<Record> {
    (1..=n).map(|i| Record::new(i * SEC, format!("m{}", i))).collect()
}

fn memory_executor(records: Vec<Record>) -> SearchExecutor {
    SearchExecutor::new(Arc::new(MemorySource::new(records)), &Config::default())
}

fn raw_executor(records: Vec<Record>, delay: Duration) -> SearchExecutor {
    SearchExecutor::new(Arc::new(RawSource { records, delay }), &Config::default())
}

fn msgs(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.msg.clone()).collect()
}

#[test]
fn test_service_filter_scenario() {
    let exec = memory_executor(services());
    let req = SearchRequest::default()
        .with_limits(0, 10)
        .with_condition(Predicate::values_in("service", ["a", "b"]).into());

    let out = exec.search(&req).unwrap();

    assert_eq!(msgs(&out.records), vec!["m0", "m1", "m2", "m3"]);
    assert_eq!(out.returned_range, TimeRange::new(10 * SEC, 40 * SEC));
    assert_eq!(out.distribution.buckets(), vec![(10, 1), (20, 1), (30, 1), (40, 1)]);
    assert_eq!(out.searched_range, TimeRange::new(0, 50 * SEC));
}

#[test]
fn test_offset_semantics() {
    let all = numbered(20);
    let exec = memory_executor(all.clone());
    let odd = ConditionNode::or(
        (1..=20)
            .step_by(2)
            .map(|i| Predicate::values_in("msg", [format!("m{}", i)]).into())
            .collect(),
    );
    let expected: Vec<String> = (1..=20).step_by(2).map(|i| format!("m{}", i)).collect();

    for (offset, limit) in [(0, 3), (2, 4), (7, 5), (9, 1), (10, 3)] {
        let req = SearchRequest::default()
            .with_limits(0, limit)
            .with_offset(offset)
            .with_condition(odd.clone());

        let plain = exec.search(&req).unwrap();
        let grouped = exec.search_and_group(&req).unwrap();

        let start = (offset as usize).min(expected.len());
        let end = (start + limit as usize).min(expected.len());
        assert_eq!(msgs(&plain.records), expected[start..end].to_vec());
        assert_eq!(msgs(&grouped.page), expected[start..end].to_vec());
        assert_eq!(grouped.matches.len(), expected.len());
    }
}

#[test]
fn test_searched_range_covers_non_matching_pulls() {
    let exec = memory_executor(numbered(5));
    let req = SearchRequest::new(TimeRange::new(SEC, 0))
        .with_condition(Predicate::values_in("msg", ["m1"]).into());

    let out = exec.search(&req).unwrap();
    assert_eq!(msgs(&out.records), vec!["m1"]);
    assert_eq!(out.searched_range, TimeRange::new(SEC, 5 * SEC));
    assert_eq!(out.returned_range, TimeRange::new(SEC, SEC));
}

#[test]
fn test_window_is_enforced_without_source_help() {
    let exec = raw_executor(numbered(6), Duration::ZERO);
    let req = SearchRequest::new(TimeRange::new(2 * SEC, 4 * SEC));

    let out = exec.search(&req).unwrap();
    assert_eq!(msgs(&out.records), vec!["m2", "m3", "m4"]);
    assert_eq!(out.searched_range, TimeRange::new(2 * SEC, 4 * SEC));
}

#[test]
fn test_search_limit_caps_pulls() {
    let exec = raw_executor(numbered(6), Duration::ZERO);
    let req = SearchRequest::default()
        .with_limits(3, 100)
        .with_condition(Predicate::greater("timestamp", (2 * SEC) as i64).into());

    let out = exec.search(&req).unwrap();
    assert_eq!(msgs(&out.records), vec!["m3"]);
    assert_eq!(out.searched_range.end, 3 * SEC);
}

#[test]
fn test_deadline_stops_the_scan() {
    let exec = raw_executor(numbered(200), Duration::from_millis(5));
    let req = SearchRequest::default().with_limits(0, 1000).with_timeout_ms(40);

    let out = exec.search(&req).unwrap();

    // The record pulled past the deadline is still emitted
    assert!(!out.records.is_empty());
    assert!(out.records.len() < 200);
    assert_eq!(out.returned_range.end, out.searched_range.end);
    assert_eq!(out.distribution.total(), out.records.len() as u64);
}

#[test]
fn test_deadline_with_nothing_matching() {
    let exec = raw_executor(numbered(200), Duration::from_millis(5));
    let req = SearchRequest::default()
        .with_timeout_ms(40)
        .with_condition(Predicate::is_null("msg").into());

    let out = exec.search(&req).unwrap();
    assert!(out.records.is_empty());
    assert_eq!(out.returned_range, TimeRange::UNSET);
    assert!(out.searched_range.end < 200 * SEC);
}

#[test]
fn test_grouped_facets_follow_matches() {
    let records: Vec<Record> = services()
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.with_hostname(format!("h{}", i % 2)).with_field("host", format!("x{}", i)))
        .collect();
    let mut config = Config::default();
    config.facets.dynamic = 2;
    let exec = SearchExecutor::new(Arc::new(MemorySource::new(records)), &config);

    let req = SearchRequest::default()
        .with_limits(0, 2)
        .with_condition(ConditionNode::not(Predicate::values_in("service", ["c"]).into()));
    let out = exec.search_and_group(&req).unwrap();

    assert_eq!(out.page.len(), 2);
    assert_eq!(out.matches.len(), 4);

    let summaries = out.facets.summaries();
    let service = summaries.iter().find(|s| s.key == "service").unwrap();
    assert_eq!(service.values, vec![("a".to_string(), 2), ("b".to_string(), 2)]);

    // four distinct values against a ceiling of two, frozen at the third
    let host = summaries.iter().find(|s| s.key == "host").unwrap();
    assert_eq!(host.total_count, 3);
    assert!(host.values.is_empty());
}
