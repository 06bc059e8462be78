use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use crate::core::error::{Error, Result};
use crate::core::types::{Record, SearchRequest, TimeRange};
use crate::source::{LogIterator, LogSource, ScanWindow};

/// File of one JSON record per line, sorted by timestamp.
///
/// Lines that fail to decode are logged and skipped.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    pub path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::source_unavailable(format!(
                "Log file not found: {}",
                path.display()
            )));
        }
        Ok(JsonLinesSource { path })
    }

    fn reader(&self) -> Result<RecordLines> {
        let file = File::open(&self.path).map_err(|e| {
            Error::source_unavailable(format!("Failed to open {}: {}", self.path.display(), e))
        })?;
        Ok(RecordLines::new(&self.path, file))
    }
}

impl LogSource for JsonLinesSource {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn open(&self, request: &SearchRequest) -> Result<Box<dyn LogIterator>> {
        Ok(Box::new(JsonLinesIterator {
            source: self.clone(),
            lines: self.reader()?,
            window: ScanWindow::new(request),
        }))
    }

    fn all_available_range(&self) -> Result<TimeRange> {
        let mut lines = self.reader()?;
        let mut range: Option<TimeRange> = None;

        while let Some(record) = lines.next_record()? {
            range = Some(match range {
                None => TimeRange::new(record.timestamp, record.timestamp),
                Some(r) => TimeRange::new(r.start.min(record.timestamp), r.end.max(record.timestamp)),
            });
        }
        Ok(range.unwrap_or(TimeRange::UNSET))
    }
}

/// Decoded records of one file, bad lines dropped
struct RecordLines {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl RecordLines {
    fn new(path: &Path, file: File) -> Self {
        RecordLines {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        }
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line.map_err(|e| {
                Error::read_failure(format!("{}:{}: {}", self.path.display(), self.line_no, e))
            })?;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Record>(line) {
                Ok(record) => return Ok(Some(record)),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = self.line_no,
                        error = %e,
                        "skipping malformed log line"
                    );
                }
            }
        }
        Ok(None)
    }
}

pub struct JsonLinesIterator {
    source: JsonLinesSource,
    lines: RecordLines,
    window: ScanWindow,
}

impl LogIterator for JsonLinesIterator {
    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if self.window.exhausted() {
                return Ok(None);
            }

            let Some(record) = self.lines.next_record()? else {
                return Ok(None);
            };

            // Seek phase, not counted against the pull cap
            if self.window.range.starts_after(record.timestamp) {
                continue;
            }
            if !self.window.admit(record.timestamp) {
                return Ok(None);
            }
            return Ok(Some(record));
        }
    }

    fn scanned_range(&self) -> TimeRange {
        self.window.scanned()
    }

    fn all_available_range(&self) -> Result<TimeRange> {
        self.source.all_available_range()
    }
}
