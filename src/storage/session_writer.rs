use std::fs::File;
use std::io::{BufWriter, Write};
use crate::core::error::Result;
use crate::core::types::Record;
use crate::storage::layout::SessionLayout;
use crate::storage::session::SessionId;

/// Writes one session: a flat concatenation of encoded records plus a flat
/// array of 8-byte little-endian record-start offsets.
pub struct SessionWriter {
    pub records: BufWriter<File>,
    pub index: BufWriter<File>,
    pub position: u64,
    pub count: u64,
}

impl SessionWriter {
    pub fn create(layout: &SessionLayout, id: &SessionId) -> Result<Self> {
        let records = File::create(layout.records_path(id))?;
        let index = File::create(layout.index_path(id))?;

        Ok(SessionWriter {
            records: BufWriter::new(records),
            index: BufWriter::new(index),
            position: 0,
            count: 0,
        })
    }

    pub fn append(&mut self, record: &Record) -> Result<()> {
        let data = bincode::serialize(record)?;

        self.index.write_all(&self.position.to_le_bytes())?;
        self.records.write_all(&data)?;

        self.position += data.len() as u64;
        self.count += 1;
        Ok(())
    }

    /// Flush and fsync both files. Returns the record count.
    pub fn finish(mut self) -> Result<u64> {
        self.records.flush()?;
        self.index.flush()?;
        self.records.get_ref().sync_all()?;
        self.index.get_ref().sync_all()?;
        Ok(self.count)
    }
}
