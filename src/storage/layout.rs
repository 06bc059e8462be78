use std::path::{Path, PathBuf};
use std::fs;
use crate::core::error::Result;
use crate::storage::session::SessionId;

/// Directory structure for session files
#[derive(Debug, Clone)]
pub struct SessionLayout {
    pub base_dir: PathBuf,          // Root directory
    pub sessions_dir: PathBuf,      // Record and offset-index files, one pair per session
}

impl SessionLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let sessions_dir = base_dir.join("searches");

        fs::create_dir_all(&sessions_dir)?;

        Ok(SessionLayout {
            base_dir,
            sessions_dir,
        })
    }

    /// Wipe whatever a previous process left behind, then recreate
    pub fn reset(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let sessions_dir = base_dir.join("searches");

        if sessions_dir.exists() {
            fs::remove_dir_all(&sessions_dir)?;
        }
        Self::new(base_dir)
    }

    pub fn records_path(&self, id: &SessionId) -> PathBuf {
        self.sessions_dir.join(format!("{}.rec", id.0))
    }

    pub fn index_path(&self, id: &SessionId) -> PathBuf {
        self.sessions_dir.join(format!("{}.idx", id.0))
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }
}
