use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use crate::core::error::{Error, Result};
use crate::source::jsonl::JsonLinesSource;
use crate::source::memory::MemorySource;
use crate::source::LogSource;

/// Settings handed to a source factory
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub path: Option<PathBuf>,
}

pub type SourceFactory = fn(&SourceOptions) -> Result<Arc<dyn LogSource>>;

/// Sources selectable by name at startup
pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        SourceRegistry {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding the bundled `memory` and `jsonl` sources
    pub fn with_builtin() -> Self {
        let mut registry = SourceRegistry::new();
        registry.register("memory", memory_factory);
        registry.register("jsonl", jsonl_factory);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: SourceFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn create(&self, name: &str, options: &SourceOptions) -> Result<Arc<dyn LogSource>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::source_unavailable(format!(
                "Unknown source '{}', available: {}",
                name,
                self.names().join(", ")
            ))
        })?;

        let source = factory(options)?;
        tracing::info!(source = name, "log source loaded");
        Ok(source)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

fn memory_factory(_options: &SourceOptions) -> Result<Arc<dyn LogSource>> {
    Ok(Arc::new(MemorySource::default()))
}

fn jsonl_factory(options: &SourceOptions) -> Result<Arc<dyn LogSource>> {
    let path = options
        .path
        .clone()
        .ok_or_else(|| Error::source_unavailable("jsonl source needs a path"))?;
    Ok(Arc::new(JsonLinesSource::new(path)?))
}
