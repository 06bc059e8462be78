use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::Record;
use crate::storage::layout::SessionLayout;
use crate::storage::session::SessionId;
use crate::storage::session_reader::SessionReader;
use crate::storage::session_writer::SessionWriter;

/// Registry entry of one persisted session
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub created_at: DateTime<Utc>,
    pub record_count: u64,
    pub lock: Arc<RwLock<()>>,     // guards the session's files
}

/// Process-wide directory of persisted grouped searches.
///
/// Two lock layers, always taken outer then inner:
/// - `sessions` maps ids to per-session locks. Held briefly for lookups,
///   exclusively for the whole of a register or delete.
/// - each entry's `lock` guards that session's files. Shared while a page
///   is read, exclusive while the files are deleted.
///
/// Lookups release the outer lock before blocking on the inner one, so a
/// slow read never stalls unrelated registry operations.
pub struct SessionStore {
    pub layout: SessionLayout,
    pub sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    pub scratch_size: usize,
}

impl SessionStore {
    /// Wipes and recreates the session area; sessions never survive a restart.
    pub fn open(config: &Config) -> Result<Self> {
        let layout = SessionLayout::reset(&config.session_dir)?;
        tracing::info!(dir = %layout.sessions_dir().display(), "session storage ready");

        Ok(SessionStore {
            layout,
            sessions: RwLock::new(HashMap::new()),
            scratch_size: config.page_scratch_size,
        })
    }

    /// Persist a full match set and register it under a fresh id
    pub fn create(&self, records: &[Record]) -> Result<SessionId> {
        let id = SessionId::new();

        let written = self.write_files(&id, records);
        let record_count = match written {
            Ok(count) => count,
            Err(e) => {
                self.delete_files(&id);
                return Err(e);
            }
        };

        let entry = SessionEntry {
            created_at: Utc::now(),
            record_count,
            lock: Arc::new(RwLock::new(())),
        };
        self.sessions.write().insert(id, entry);

        tracing::info!(session = %id, records = record_count, "session created");
        Ok(id)
    }

    fn write_files(&self, id: &SessionId, records: &[Record]) -> Result<u64> {
        let mut writer = SessionWriter::create(&self.layout, id)?;
        for record in records {
            writer.append(record)?;
        }
        writer.finish()
    }

    /// Replay `[offset, offset + limit)` of a session.
    ///
    /// Unknown or reclaimed ids give `NotFound`. A registered session whose
    /// files are gone or damaged gives `ReadFailure`.
    pub fn read_page(&self, raw_id: &str, offset: u64, limit: u64) -> Result<Vec<Record>> {
        let span = tracing::debug_span!("load_session", session = raw_id, offset, limit);
        let _enter = span.enter();

        let id = SessionId::parse(raw_id)
            .ok_or_else(|| Error::not_found(format!("Unknown session: {}", raw_id)))?;

        let lock = {
            let sessions = self.sessions.read();
            sessions.get(&id).map(|entry| entry.lock.clone())
        }
        .ok_or_else(|| Error::not_found(format!("Unknown session: {}", raw_id)))?;

        let _guard = lock.read();
        let mut reader = SessionReader::open(&self.layout, &id)?;
        let page = reader.read_page(offset, limit, self.scratch_size)?;

        tracing::debug!(returned = page.len(), "session page loaded");
        Ok(page)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().contains_key(id)
    }

    pub fn get(&self, id: &SessionId) -> Option<SessionEntry> {
        self.sessions.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete one session. Returns false when it was not registered.
    pub fn remove(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.write();
        let Some(entry) = sessions.get(id) else {
            return false;
        };

        {
            let _guard = entry.lock.write();
            self.delete_files(id);
        }
        sessions.remove(id);

        tracing::info!(session = %id, "session removed");
        true
    }

    /// Remove every session created at or before `cutoff`
    pub fn reap_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let expired: Vec<SessionId> = {
            let sessions = self.sessions.read();
            sessions
                .iter()
                .filter(|(_, entry)| entry.created_at <= cutoff)
                .map(|(id, _)| *id)
                .collect()
        };

        expired.iter().filter(|id| self.remove(id)).count()
    }

    pub fn reap_expired(&self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        match Utc::now().checked_sub_signed(retention) {
            Some(cutoff) => self.reap_older_than(cutoff),
            None => 0,
        }
    }

    /// Remove every session regardless of age
    pub fn reap_all(&self) -> usize {
        let ids: Vec<SessionId> = self.sessions.read().keys().copied().collect();
        ids.iter().filter(|id| self.remove(id)).count()
    }

    fn delete_files(&self, id: &SessionId) {
        remove_quietly(&self.layout.records_path(id));
        remove_quietly(&self.layout.index_path(id));
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        let removed = self.reap_all();
        if removed > 0 {
            tracing::info!(removed, "sessions reclaimed on drop");
        }
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to delete session file"),
    }
}
