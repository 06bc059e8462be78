use std::sync::Arc;
use crate::core::error::Result;
use crate::core::types::{Record, SearchRequest, TimeRange};
use crate::source::{LogIterator, LogSource, ScanWindow};

/// Time-ordered records held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Arc<Vec<Record>>,
}

impl MemorySource {
    pub fn new(mut records: Vec<Record>) -> Self {
        // Stable, so records sharing a timestamp keep arrival order
        records.sort_by_key(|r| r.timestamp);
        MemorySource {
            records: Arc::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn available(&self) -> TimeRange {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => TimeRange::new(first.timestamp, last.timestamp),
            _ => TimeRange::UNSET,
        }
    }
}

impl LogSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(&self, request: &SearchRequest) -> Result<Box<dyn LogIterator>> {
        let start = request.range.start;
        let position = self.records.partition_point(|r| r.timestamp < start);

        Ok(Box::new(MemoryIterator {
            records: self.records.clone(),
            position,
            window: ScanWindow::new(request),
            available: self.available(),
        }))
    }

    fn all_available_range(&self) -> Result<TimeRange> {
        Ok(self.available())
    }
}

pub struct MemoryIterator {
    records: Arc<Vec<Record>>,
    position: usize,
    window: ScanWindow,
    available: TimeRange,
}

impl LogIterator for MemoryIterator {
    fn next_record(&mut self) -> Result<Option<Record>> {
        if self.window.exhausted() {
            return Ok(None);
        }

        let Some(record) = self.records.get(self.position) else {
            return Ok(None);
        };
        if !self.window.admit(record.timestamp) {
            return Ok(None);
        }

        self.position += 1;
        Ok(Some(record.clone()))
    }

    fn scanned_range(&self) -> TimeRange {
        self.window.scanned()
    }

    fn all_available_range(&self) -> Result<TimeRange> {
        Ok(self.available)
    }
}
