use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::query::ast::ConditionNode;

/// Request timeout used when a caller passes 0
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Timestamp window in microseconds. `(0, 0)` means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: u64,
    pub end: u64,
}

impl TimeRange {
    pub const UNSET: TimeRange = TimeRange { start: 0, end: 0 };

    pub fn new(start: u64, end: u64) -> Self {
        TimeRange { start, end }
    }

    pub fn is_unset(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// True when `ts` lies past a bounded end. An end of 0 is open.
    pub fn ends_before(&self, ts: u64) -> bool {
        self.end != 0 && ts > self.end
    }

    pub fn starts_after(&self, ts: u64) -> bool {
        ts < self.start
    }
}

/// Free-form key/value pair attached to a record. Keys may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub value: String,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Field { key: key.into(), value: value.into() }
    }
}

/// One log record as pulled from a source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: u64,     // µs since epoch
    #[serde(default)]
    pub id: u64,            // match sequence, only assigned by grouped search
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Record {
    pub fn new(timestamp: u64, msg: impl Into<String>) -> Self {
        Record {
            timestamp,
            msg: msg.into(),
            ..Default::default()
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field::new(key, value));
        self
    }

    /// First value stored under `key` in the field list
    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    pub fn second(&self) -> u64 {
        self.timestamp / 1_000_000
    }
}

/// A validated search over one source.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub range: TimeRange,
    pub search_limit: u64,   // max records pulled, 0 = no cap
    pub return_limit: u64,   // max records materialized into the page
    pub offset: u64,         // matches skipped before counting toward return_limit
    pub condition: Option<ConditionNode>,
    pub timeout: Duration,
    pub session_id: Option<String>,
}

impl SearchRequest {
    pub fn new(range: TimeRange) -> Self {
        SearchRequest {
            range,
            ..Default::default()
        }
    }

    pub fn with_limits(mut self, search_limit: u64, return_limit: u64) -> Self {
        self.search_limit = search_limit;
        self.return_limit = return_limit;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_condition(mut self, condition: ConditionNode) -> Self {
        self.condition = Some(condition);
        self
    }

    /// 0 selects [`DEFAULT_TIMEOUT_MS`]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = timeout_from_ms(timeout_ms, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            range: TimeRange::UNSET,
            search_limit: 0,
            return_limit: 100,
            offset: 0,
            condition: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            session_id: None,
        }
    }
}

pub fn timeout_from_ms(timeout_ms: u64, default: Duration) -> Duration {
    if timeout_ms == 0 {
        default
    } else {
        Duration::from_millis(timeout_ms)
    }
}
