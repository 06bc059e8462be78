use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use log_indexer::core::config::Config;
use log_indexer::core::error::{ErrorKind, Result};
use log_indexer::core::types::{Record, SearchRequest, TimeRange};
use log_indexer::core::utils::now_us;
use log_indexer::service::indexer::LogIndexer;
use log_indexer::service::proto::{
    ConditionStatement, FieldStatement, SearchQuery, SubOp, SubStatement, ALL_SERIES,
};
use log_indexer::service::stdio::handle_request;
use log_indexer::source::memory::MemorySource;
use log_indexer::source::{LogIterator, LogSource};
use serde_json::Value;

const SEC: u64 = 1_000_000;

/// Memory source that counts how often it gets opened
struct CountingSource {
    inner: MemorySource,
    opened: AtomicUsize,
}

impl LogSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    fn open(&self, request: &SearchRequest) -> Result<Box<dyn LogIterator>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.inner.open(request)
    }

    fn all_available_range(&self) -> Result<TimeRange> {
        self.inner.all_available_range()
    }
}

struct BrokenSource;

impl LogSource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    fn open(&self, _request: &SearchRequest) -> Result<Box<dyn LogIterator>> {
        Err(log_indexer::core::error::Error::source_unavailable("journal not readable"))
    }
}

fn records() -> Vec<Record> {
    (1..=12)
        .map(|i| {
            Record::new(i * SEC, format!("request {}", i))
                .with_service(if i % 2 == 0 { "api" } else { "worker" })
                .with_hostname("node-1")
                .with_field("STATUS", if i % 4 == 0 { "500" } else { "200" })
        })
        .collect()
}

fn indexer(dir: &std::path::Path) -> (LogIndexer, Arc<CountingSource>) {
    let source = Arc::new(CountingSource {
        inner: MemorySource::new(records()),
        opened: AtomicUsize::new(0),
    });
    let indexer = LogIndexer::new(source.clone(), Config::default().with_session_dir(dir)).unwrap();
    (indexer, source)
}

fn service_is(values: &[&str]) -> ConditionStatement {
    ConditionStatement {
        field_statement: Some(FieldStatement {
            key: "service".to_string(),
            values_in: values.iter().map(|v| v.to_string()).collect(),
            ..Default::default()
        }),
        sub_statement: None,
    }
}

#[test]
fn test_health_check_reports_now() {
    let dir = tempfile::tempdir().unwrap();
    let (indexer, _) = indexer(dir.path());
    let before = now_us();
    let local = indexer.health_check().local_time.as_micros();
    assert!(local >= before);
    assert!(local - before < 60 * SEC);
}

#[test]
fn test_unavailable_source_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let err = LogIndexer::new(Arc::new(BrokenSource), Config::default().with_session_dir(dir.path()))
        .err()
        .unwrap();
    assert_eq!(err.kind, ErrorKind::SourceUnavailable);
}

#[test]
fn test_malformed_condition_never_reaches_source() {
    let dir = tempfile::tempdir().unwrap();
    let (indexer, source) = indexer(dir.path());
    let opened = source.opened.load(Ordering::SeqCst);

    let query = SearchQuery {
        conditions: Some(ConditionStatement {
            field_statement: None,
            sub_statement: Some(SubStatement {
                sub_op: SubOp::And,
                sub_statements: vec![
                    service_is(&["api"]),
                    ConditionStatement {
                        field_statement: Some(FieldStatement {
                            key: "STATUS".to_string(),
                            ..Default::default()
                        }),
                        sub_statement: None,
                    },
                ],
            }),
        }),
        ..Default::default()
    };

    assert_eq!(indexer.search(&query).unwrap_err().kind, ErrorKind::InvalidArgument);
    assert_eq!(indexer.search_and_group(&query).unwrap_err().kind, ErrorKind::InvalidArgument);
    assert_eq!(source.opened.load(Ordering::SeqCst), opened);
}

#[test]
fn test_plain_search_result_shape() {
    let dir = tempfile::tempdir().unwrap();
    let (indexer, _) = indexer(dir.path());

    let query = SearchQuery {
        return_limit: 3,
        return_offset: 1,
        conditions: Some(service_is(&["api"])),
        ..Default::default()
    };
    let result = indexer.search(&query).unwrap();

    let secs: Vec<u64> = result.log.iter().map(|e| e.timestamp.sec).collect();
    assert_eq!(secs, vec![4, 6, 8]);
    assert_eq!(result.returned_range.start.sec, 4);
    assert_eq!(result.returned_range.end.sec, 8);
    assert!(result.search_id.is_empty());

    assert_eq!(result.time_series.len(), 1);
    assert_eq!(result.time_series[0].name, ALL_SERIES);
    // skipped match at 2s still counts, page stops at the limit
    let buckets: Vec<u64> = result.time_series[0].time_distribution.iter().map(|b| b.sec).collect();
    assert_eq!(buckets, vec![2, 4, 6, 8]);
}

#[test]
fn test_group_then_paginate() {
    let dir = tempfile::tempdir().unwrap();
    let (indexer, source) = indexer(dir.path());

    let grouped = indexer
        .search_and_group(&SearchQuery { return_limit: 4, ..Default::default() })
        .unwrap();
    let search_id = grouped.search_result.search_id.clone();
    assert!(!search_id.is_empty());
    assert_eq!(grouped.search_result.log.len(), 4);
    assert_eq!(grouped.total_count, 12);

    let status = grouped.field_infos.iter().find(|f| f.key == "STATUS").unwrap();
    assert_eq!(status.total_count, 12);
    assert_eq!(status.values[0].value, "200");
    assert_eq!(status.values[0].count, 9);

    let ts = grouped.field_infos.iter().find(|f| f.key == "timestamp").unwrap();
    assert_eq!(ts.values.len(), 12);
    assert!(ts.ranges.is_none());

    let opened = source.opened.load(Ordering::SeqCst);

    // Predicates are ignored on replay
    let page = indexer
        .search(&SearchQuery {
            return_offset: 4,
            return_limit: 5,
            conditions: Some(service_is(&["nobody"])),
            search_id: search_id.clone(),
            ..Default::default()
        })
        .unwrap();
    let ids: Vec<u64> = page.log.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![4, 5, 6, 7, 8]);
    assert_eq!(page.returned_range.start.sec, 5);
    assert_eq!(page.search_id, search_id);

    let tail = indexer
        .search_and_group(&SearchQuery {
            return_offset: 9,
            return_limit: 10,
            search_id: search_id.clone(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(tail.search_result.log.len(), 3);
    assert!(tail.field_infos.is_empty());
    assert_eq!(tail.search_result.search_id, search_id);

    assert_eq!(source.opened.load(Ordering::SeqCst), opened);
}

#[test]
fn test_unknown_session_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (indexer, _) = indexer(dir.path());
    let err = indexer
        .search(&SearchQuery { search_id: "3b1f0c7e-0000-4000-8000-000000000000".to_string(), ..Default::default() })
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_shutdown_reclaims_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let (indexer, _) = indexer(dir.path());
    indexer.search_and_group(&SearchQuery::default()).unwrap();
    indexer.search_and_group(&SearchQuery::default()).unwrap();
    assert_eq!(indexer.sessions.len(), 2);

    indexer.shutdown();
    assert!(indexer.sessions.is_empty());
    assert_eq!(std::fs::read_dir(indexer.sessions.layout.sessions_dir()).unwrap().count(), 0);
}

#[test]
fn test_stdio_envelopes() {
    let dir = tempfile::tempdir().unwrap();
    let (indexer, _) = indexer(dir.path());

    let health: Value = serde_json::from_str(&handle_request(&indexer, r#"{"id": 1, "method": "healthCheck"}"#)).unwrap();
    assert_eq!(health["id"], 1);
    assert!(health["result"]["local_time"]["sec"].as_u64().unwrap() > 0);

    let line = r#"{"id": "g", "method": "searchAndGroup", "params": {"return_limit": 2,
        "conditions": {"field_statement": {"key": "service", "values_in": ["worker"]}}}}"#;
    let grouped: Value = serde_json::from_str(&handle_request(&indexer, line)).unwrap();
    assert_eq!(grouped["id"], "g");
    assert_eq!(grouped["result"]["search_result"]["log"].as_array().unwrap().len(), 2);
    let search_id = grouped["result"]["search_result"]["search_id"].as_str().unwrap().to_string();

    let line = format!(
        r#"{{"id": 2, "method": "search", "params": {{"return_offset": 2, "return_limit": 10, "search_id": "{}"}}}}"#,
        search_id
    );
    let page: Value = serde_json::from_str(&handle_request(&indexer, &line)).unwrap();
    assert_eq!(page["result"]["log"].as_array().unwrap().len(), 4);

    let bad: Value = serde_json::from_str(&handle_request(&indexer, r#"{"id": 3, "method": "search", "params": {"conditions": {}}}"#)).unwrap();
    assert_eq!(bad["id"], 3);
    assert_eq!(bad["error"]["kind"], "invalid_argument");

    let garbage: Value = serde_json::from_str(&handle_request(&indexer, "not json")).unwrap();
    assert_eq!(garbage["error"]["kind"], "invalid_argument");
    assert!(garbage.get("result").is_none());
}
