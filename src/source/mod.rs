pub mod memory;
pub mod jsonl;
pub mod registry;

use crate::core::error::Result;
use crate::core::types::{Record, SearchRequest, TimeRange};

/// Pull-based cursor over one source, opened for one request.
///
/// Implementations scan in one direction (ascending time) and may use the
/// request's window or limits to skip work, but the executor re-checks
/// everything it needs.
pub trait LogIterator: Send {
    /// Next record, or `None` once the scan is over
    fn next_record(&mut self) -> Result<Option<Record>>;

    /// `[requested start, last pulled timestamp]`
    fn scanned_range(&self) -> TimeRange;

    /// First and last timestamps available in the source, independent of the request
    fn all_available_range(&self) -> Result<TimeRange>;
}

/// Factory of iterators. The engine only ever holds `Arc<dyn LogSource>`.
pub trait LogSource: Send + Sync {
    fn name(&self) -> &str;

    fn open(&self, request: &SearchRequest) -> Result<Box<dyn LogIterator>>;

    fn all_available_range(&self) -> Result<TimeRange> {
        self.open(&SearchRequest::default())?.all_available_range()
    }
}

/// Window and pull-cap bookkeeping shared by the bundled sources
#[derive(Debug, Clone)]
pub struct ScanWindow {
    pub range: TimeRange,
    pub remaining: Option<u64>,
    pub last_pulled: Option<u64>,
}

impl ScanWindow {
    pub fn new(request: &SearchRequest) -> Self {
        ScanWindow {
            range: request.range,
            remaining: (request.search_limit > 0).then_some(request.search_limit),
            last_pulled: None,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Account for a pulled record. Returns false once the record lies past
    /// the window end, which ends the scan.
    pub fn admit(&mut self, ts: u64) -> bool {
        if self.range.ends_before(ts) {
            self.remaining = Some(0);
            return false;
        }
        if let Some(left) = self.remaining.as_mut() {
            *left = left.saturating_sub(1);
        }
        self.last_pulled = Some(ts);
        true
    }

    pub fn scanned(&self) -> TimeRange {
        TimeRange::new(self.range.start, self.last_pulled.unwrap_or(0))
    }
}
