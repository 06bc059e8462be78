use std::sync::Arc;
use parking_lot::Mutex;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::SearchRequest;
use crate::core::utils::now_us;
use crate::search::executor::SearchExecutor;
use crate::search::results::{page_range, Distribution};
use crate::service::proto::{
    FieldInfo, HealthCheckResult, LogGroupResult, LogSearchResult, SearchQuery, Timestamp,
};
use crate::source::LogSource;
use crate::storage::reaper::Reaper;
use crate::storage::registry::SessionStore;

/// The indexer service: health check, plain search and grouped search over
/// one log source, with grouped results persisted as sessions.
pub struct LogIndexer {
    pub executor: SearchExecutor,
    pub sessions: Arc<SessionStore>,
    pub config: Config,
    reaper: Mutex<Option<Reaper>>,
}

impl LogIndexer {
    /// Fails with `SourceUnavailable` when the source cannot report its range.
    pub fn new(source: Arc<dyn LogSource>, config: Config) -> Result<Self> {
        let available = source.all_available_range().map_err(|e| {
            Error::source_unavailable(format!("Source '{}' unavailable: {}", source.name(), e))
        })?;
        tracing::info!(source = source.name(), ?available, "log source ready");

        let sessions = Arc::new(SessionStore::open(&config)?);
        let reaper = Reaper::spawn(sessions.clone(), config.reap_interval, config.session_retention)?;

        Ok(LogIndexer {
            executor: SearchExecutor::new(source, &config),
            sessions,
            config,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    pub fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            local_time: Timestamp::from_micros(now_us()),
        }
    }

    pub fn search(&self, query: &SearchQuery) -> Result<LogSearchResult> {
        let request = query.to_request(self.config.default_timeout)?;
        tracing::debug!(range = ?request.range, offset = request.offset, limit = request.return_limit, "search");

        if let Some(session_id) = &request.session_id {
            return self.load_page(session_id, &request);
        }

        let out = self.executor.search(&request)?;
        Ok(LogSearchResult::from(&out))
    }

    pub fn search_and_group(&self, query: &SearchQuery) -> Result<LogGroupResult> {
        let request = query.to_request(self.config.default_timeout)?;

        if let Some(session_id) = &request.session_id {
            let search_result = self.load_page(session_id, &request)?;
            return Ok(LogGroupResult {
                search_result,
                field_infos: Vec::new(),
                total_count: 0,
            });
        }

        let out = self.executor.search_and_group(&request)?;
        let session_id = self.sessions.create(&out.matches)?;

        let mut search_result =
            LogSearchResult::new(&out.page, out.searched_range, out.returned_range, &out.distribution);
        search_result.search_id = session_id.to_string();

        Ok(LogGroupResult {
            search_result,
            field_infos: out.facets.summaries().iter().map(FieldInfo::from).collect(),
            total_count: out.facets.max_total(),
        })
    }

    /// Replay a page of a persisted session. Predicates are not re-applied.
    fn load_page(&self, session_id: &str, request: &SearchRequest) -> Result<LogSearchResult> {
        let page = self
            .sessions
            .read_page(session_id, request.offset, request.return_limit)?;

        let mut result = LogSearchResult::new(&page, request.range, page_range(&page), &Distribution::new());
        result.search_id = session_id.to_string();
        Ok(result)
    }

    /// Stop the reaper and reclaim every session
    pub fn shutdown(&self) {
        if let Some(mut reaper) = self.reaper.lock().take() {
            reaper.shutdown();
            let removed = self.sessions.reap_all();
            tracing::info!(removed, "indexer shut down");
        }
    }
}

impl Drop for LogIndexer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
