//! Request and response shapes of the indexer's RPC surface.
//!
//! Timestamps travel as `{sec, us}` pairs; everything inside the engine is
//! plain microseconds.

use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::{self, Field, Record, SearchRequest, DEFAULT_TIMEOUT_MS};
use crate::core::utils::{join_micros, split_micros};
use crate::query::ast::{BoolOp, ConditionNode, Predicate};
use crate::search::facets::FacetSummary;
use crate::search::results::{Distribution, SearchOutput};

/// Name of the single time series attached to every result
pub const ALL_SERIES: &str = "::all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub sec: u64,
    pub us: u32,
}

impl Timestamp {
    pub fn from_micros(ts: u64) -> Self {
        let (sec, us) = split_micros(ts);
        Timestamp { sec, us }
    }

    pub fn as_micros(&self) -> u64 {
        join_micros(self.sec, self.us)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl From<types::TimeRange> for TimeRange {
    fn from(range: types::TimeRange) -> Self {
        TimeRange {
            start: Timestamp::from_micros(range.start),
            end: Timestamp::from_micros(range.end),
        }
    }
}

impl From<TimeRange> for types::TimeRange {
    fn from(range: TimeRange) -> Self {
        types::TimeRange::new(range.start.as_micros(), range.end.as_micros())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubOp {
    And,
    Or,
    Not,
}

impl From<SubOp> for BoolOp {
    fn from(op: SubOp) -> Self {
        match op {
            SubOp::And => BoolOp::And,
            SubOp::Or => BoolOp::Or,
            SubOp::Not => BoolOp::Not,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldStatement {
    pub key: String,
    pub greater: Option<i64>,
    pub values_in: Vec<String>,
    pub values_regex: String,
    pub is_null: bool,
    pub is_not_null: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStatement {
    pub sub_op: SubOp,
    #[serde(default)]
    pub sub_statements: Vec<ConditionStatement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionStatement {
    pub field_statement: Option<FieldStatement>,
    pub sub_statement: Option<SubStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub range: Option<TimeRange>,
    pub search_limit: u64,
    pub return_limit: u64,
    pub return_offset: u64,
    pub conditions: Option<ConditionStatement>,
    pub timeout_ms: u64,
    pub search_id: String,
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            range: None,
            search_limit: 0,
            return_limit: 100,
            return_offset: 0,
            conditions: None,
            timeout_ms: 0,
            search_id: String::new(),
        }
    }
}

impl TryFrom<&FieldStatement> for Predicate {
    type Error = Error;

    /// The first test set wins: greater, values_in, values_regex, is_null, is_not_null.
    fn try_from(stmt: &FieldStatement) -> Result<Self> {
        let key = stmt.key.clone();

        if let Some(threshold) = stmt.greater {
            Ok(Predicate::greater(key, threshold))
        } else if !stmt.values_in.is_empty() {
            Ok(Predicate::values_in(key, stmt.values_in.iter().cloned()))
        } else if !stmt.values_regex.is_empty() {
            Predicate::matches(key, &stmt.values_regex)
        } else if stmt.is_null {
            Ok(Predicate::is_null(key))
        } else if stmt.is_not_null {
            Ok(Predicate::is_not_null(key))
        } else {
            Err(Error::invalid_argument(format!(
                "Field statement on '{}' sets no test",
                stmt.key
            )))
        }
    }
}

impl TryFrom<&ConditionStatement> for ConditionNode {
    type Error = Error;

    fn try_from(stmt: &ConditionStatement) -> Result<Self> {
        if let Some(field) = &stmt.field_statement {
            return Ok(ConditionNode::Predicate(Predicate::try_from(field)?));
        }

        let sub = stmt.sub_statement.as_ref().ok_or_else(|| {
            Error::invalid_argument("Condition is neither a field statement nor a sub statement")
        })?;
        let children = sub
            .sub_statements
            .iter()
            .map(ConditionNode::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(ConditionNode::group(sub.sub_op.into(), children))
    }
}

impl SearchQuery {
    /// Validate and convert. A timeout of 0 selects `default_timeout`.
    pub fn to_request(&self, default_timeout: Duration) -> Result<SearchRequest> {
        let condition = self
            .conditions
            .as_ref()
            .map(ConditionNode::try_from)
            .transpose()?;

        Ok(SearchRequest {
            range: self.range.map(Into::into).unwrap_or(types::TimeRange::UNSET),
            search_limit: self.search_limit,
            return_limit: self.return_limit,
            offset: self.return_offset,
            condition,
            timeout: types::timeout_from_ms(self.timeout_ms, default_timeout),
            session_id: (!self.search_id.is_empty()).then(|| self.search_id.clone()),
        })
    }
}

impl TryFrom<&SearchQuery> for SearchRequest {
    type Error = Error;

    fn try_from(query: &SearchQuery) -> Result<Self> {
        query.to_request(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub id: u64,
    pub msg: String,
    pub service_name: String,
    pub hostname: String,
    pub unit: String,
    pub additional_fields: Vec<Field>,
}

impl From<&Record> for LogEntry {
    fn from(record: &Record) -> Self {
        LogEntry {
            timestamp: Timestamp::from_micros(record.timestamp),
            id: record.id,
            msg: record.msg.clone(),
            service_name: record.service.clone(),
            hostname: record.hostname.clone(),
            unit: record.unit.clone(),
            additional_fields: record.fields.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub sec: u64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    pub time_distribution: Vec<TimeBucket>,
}

impl From<&Distribution> for TimeSeries {
    fn from(dist: &Distribution) -> Self {
        TimeSeries {
            name: ALL_SERIES.to_string(),
            time_distribution: dist
                .buckets()
                .into_iter()
                .map(|(sec, count)| TimeBucket { sec, count })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSearchResult {
    pub log: Vec<LogEntry>,
    pub searched_range: TimeRange,
    pub returned_range: TimeRange,
    pub time_series: Vec<TimeSeries>,
    pub search_id: String,
}

impl LogSearchResult {
    pub fn new(
        records: &[Record],
        searched_range: types::TimeRange,
        returned_range: types::TimeRange,
        distribution: &Distribution,
    ) -> Self {
        LogSearchResult {
            log: records.iter().map(LogEntry::from).collect(),
            searched_range: searched_range.into(),
            returned_range: returned_range.into(),
            time_series: vec![TimeSeries::from(distribution)],
            search_id: String::new(),
        }
    }
}

impl From<&SearchOutput> for LogSearchResult {
    fn from(out: &SearchOutput) -> Self {
        LogSearchResult::new(&out.records, out.searched_range, out.returned_range, &out.distribution)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub key: String,
    pub total_count: u64,
    pub values: Vec<ValueCount>,
    pub ranges: Option<ValueRange>,
}

impl From<&FacetSummary> for FieldInfo {
    fn from(summary: &FacetSummary) -> Self {
        FieldInfo {
            key: summary.key.clone(),
            total_count: summary.total_count,
            values: summary
                .values
                .iter()
                .map(|(value, count)| ValueCount { value: value.clone(), count: *count })
                .collect(),
            ranges: summary.range.map(|(min, max)| ValueRange { min, max }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroupResult {
    pub search_result: LogSearchResult,
    pub field_infos: Vec<FieldInfo>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub local_time: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::query::matcher::evaluate;

    fn field(key: &str) -> FieldStatement {
        FieldStatement { key: key.to_string(), ..Default::default() }
    }

    #[test]
    fn test_timestamp_split() {
        let ts = Timestamp::from_micros(10_000_042);
        assert_eq!(ts, Timestamp { sec: 10, us: 42 });
        assert_eq!(ts.as_micros(), 10_000_042);
    }

    #[test]
    fn test_field_statement_precedence() {
        let stmt = FieldStatement {
            greater: Some(5),
            values_in: vec!["a".to_string()],
            is_null: true,
            ..field("msg_len")
        };
        let predicate = Predicate::try_from(&stmt).unwrap();
        assert!(matches!(predicate.test, crate::query::ast::FieldTest::Greater(5)));

        // empty values_in and regex fall through to the null checks
        let stmt = FieldStatement { is_not_null: true, ..field("unit") };
        let predicate = Predicate::try_from(&stmt).unwrap();
        assert!(matches!(predicate.test, crate::query::ast::FieldTest::IsNotNull));
    }

    #[test]
    fn test_malformed_conditions() {
        let err = Predicate::try_from(&field("service")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let err = ConditionNode::try_from(&ConditionStatement::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let nested = ConditionStatement {
            field_statement: None,
            sub_statement: Some(SubStatement {
                sub_op: SubOp::And,
                sub_statements: vec![ConditionStatement::default()],
            }),
        };
        assert!(ConditionNode::try_from(&nested).is_err());

        let bad_regex = FieldStatement { values_regex: "(".to_string(), ..field("msg") };
        assert_eq!(Predicate::try_from(&bad_regex).unwrap_err().kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_query_from_json() {
        let json = r#"{
            "range": {"start": {"sec": 10, "us": 0}, "end": {"sec": 40, "us": 0}},
            "return_limit": 10,
            "conditions": {"sub_statement": {"sub_op": "OR", "sub_statements": [
                {"field_statement": {"key": "service", "values_in": ["a"]}},
                {"field_statement": {"key": "service", "values_in": ["b"]}}
            ]}}
        }"#;
        let query: SearchQuery = serde_json::from_str(json).unwrap();
        let request = SearchRequest::try_from(&query).unwrap();

        assert_eq!(request.range, types::TimeRange::new(10_000_000, 40_000_000));
        assert_eq!(request.return_limit, 10);
        assert_eq!(request.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert!(request.session_id.is_none());

        let condition = request.condition.unwrap();
        assert!(evaluate(&condition, &Record::new(1, "x").with_service("b")));
        assert!(!evaluate(&condition, &Record::new(1, "x").with_service("c")));
    }

    #[test]
    fn test_field_info_from_summary() {
        let summary = FacetSummary {
            key: "msg_len".to_string(),
            total_count: 40,
            values: Vec::new(),
            range: Some((1, 90)),
        };
        let info = FieldInfo::from(&summary);
        assert_eq!(info.ranges, Some(ValueRange { min: 1, max: 90 }));
        assert_eq!(info.total_count, 40);
    }
}
