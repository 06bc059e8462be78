use std::fs::File;
use std::io::{BufReader, ErrorKind as IoErrorKind, Read, Seek, SeekFrom};
use crate::core::error::{Error, Result};
use crate::core::types::Record;
use crate::storage::layout::SessionLayout;
use crate::storage::session::SessionId;

const OFFSET_SIZE: u64 = 8;
const MAX_RECORD_SIZE: u64 = 64 * 1024 * 1024;

/// Reads pages out of a persisted session.
///
/// Every failure here maps to `ReadFailure`: the caller already knows the
/// session is registered, so missing or short files mean it raced with
/// reclamation or got corrupted.
pub struct SessionReader {
    pub id: SessionId,
    pub records: BufReader<File>,
    pub index: BufReader<File>,
}

impl SessionReader {
    pub fn open(layout: &SessionLayout, id: &SessionId) -> Result<Self> {
        let open = |path: std::path::PathBuf| {
            File::open(&path).map_err(|e| {
                Error::read_failure(format!("Failed to open {}: {}", path.display(), e))
            })
        };

        Ok(SessionReader {
            id: *id,
            records: BufReader::new(open(layout.records_path(id))?),
            index: BufReader::new(open(layout.index_path(id))?),
        })
    }

    /// Up to `limit` records starting at match `offset`. The last record of
    /// the session has no successor offset and is read through a scratch
    /// buffer of `scratch_size` bytes.
    pub fn read_page(&mut self, offset: u64, limit: u64, scratch_size: usize) -> Result<Vec<Record>> {
        let mut page = Vec::new();
        if limit == 0 {
            return Ok(page);
        }

        self.index
            .seek(SeekFrom::Start(offset.saturating_mul(OFFSET_SIZE)))
            .map_err(|e| self.failure("seek index", e))?;

        let Some(mut current) = self.next_offset()? else {
            return Ok(page);
        };
        self.records
            .seek(SeekFrom::Start(current))
            .map_err(|e| self.failure("seek records", e))?;

        while (page.len() as u64) < limit {
            let next = self.next_offset()?;
            let data = match next {
                Some(next) => self.read_exact_record(current, next)?,
                None => self.read_last_record(scratch_size)?,
            };

            let record: Record = bincode::deserialize(&data).map_err(|e| {
                Error::read_failure(format!("Corrupted record in session {}: {}", self.id, e))
            })?;
            page.push(record);

            match next {
                Some(next) => current = next,
                None => break,
            }
        }

        Ok(page)
    }

    fn next_offset(&mut self) -> Result<Option<u64>> {
        let mut buf = [0u8; OFFSET_SIZE as usize];
        match self.index.read_exact(&mut buf) {
            Ok(()) => Ok(Some(u64::from_le_bytes(buf))),
            Err(e) if e.kind() == IoErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(self.failure("read index", e)),
        }
    }

    fn read_exact_record(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        let len = end.checked_sub(start).ok_or_else(|| {
            Error::read_failure(format!("Offsets out of order in session {}", self.id))
        })?;
        // Sanity check, a real record never gets near this
        if len > MAX_RECORD_SIZE {
            return Err(Error::read_failure(format!(
                "Record of {} bytes in session {}, index likely corrupted",
                len, self.id
            )));
        }

        let mut data = vec![0u8; len as usize];
        self.records
            .read_exact(&mut data)
            .map_err(|e| self.failure("read record", e))?;
        Ok(data)
    }

    fn read_last_record(&mut self, scratch_size: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(scratch_size.min(64 * 1024));
        let read = (&mut self.records)
            .take(scratch_size as u64)
            .read_to_end(&mut data);
        read.map_err(|e| self.failure("read record", e))?;

        if data.is_empty() {
            return Err(Error::read_failure(format!(
                "Session {} is truncated",
                self.id
            )));
        }
        Ok(data)
    }

    fn failure(&self, what: &str, err: std::io::Error) -> Error {
        Error::read_failure(format!("Failed to {} of session {}: {}", what, self.id, err))
    }
}
