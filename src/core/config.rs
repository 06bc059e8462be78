use std::path::PathBuf;
use std::time::Duration;
use crate::core::types::DEFAULT_TIMEOUT_MS;

#[derive(Debug, Clone)]
pub struct Config {
    pub session_dir: PathBuf,            // sessions live under <session_dir>/searches
    pub session_retention: Duration,     // age after which the reaper drops a session
    pub reap_interval: Duration,         // reaper tick
    pub default_timeout: Duration,       // used when a request asks for 0 ms
    pub max_grouped_matches: usize,      // cap on the persisted match set of one grouped search
    pub page_scratch_size: usize,        // read buffer for the last record of a session
    pub facets: FacetLimits,
}

/// Distinct-value ceilings per facet family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacetLimits {
    pub service: usize,
    pub hostname: usize,
    pub unit: usize,
    pub numeric: usize,     // timestamp, msg_len
    pub dynamic: usize,     // every other field key
}

impl Default for FacetLimits {
    fn default() -> Self {
        FacetLimits {
            service: 10_000,
            hostname: 100,
            unit: 10_000,
            numeric: 30,
            dynamic: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            session_dir: PathBuf::from("/tmp/log_indexer"),
            session_retention: Duration::from_secs(60 * 60),   // 1 hour
            reap_interval: Duration::from_secs(60),
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_grouped_matches: 1_000_000,
            page_scratch_size: 5 * 1024 * 1024,                // 5MB
            facets: FacetLimits::default(),
        }
    }
}

impl Config {
    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = dir.into();
        self
    }
}
