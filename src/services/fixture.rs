//! Offline collaborator serving predefined feeds and query results

use crate::core::{Item, PipeError, PipeResult};
use crate::services::{QueryService, Source, SourceError, SourceRequest, SourceStream};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Source and query service backed by predefined items
///
/// Loaded from a JSON/YAML document:
///
/// ```yaml
/// sources:
///   "http://example.com/feed": [{title: "a"}, {title: "b"}]
/// queries:
///   "select * from feed": [{title: "a"}]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureSource {
    #[serde(default)]
    sources: HashMap<String, Vec<Item>>,

    #[serde(default)]
    queries: HashMap<String, Vec<Item>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: impl Into<String>, items: Vec<Item>) -> Self {
        self.sources.insert(url.into(), items);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>, rows: Vec<Item>) -> Self {
        self.queries.insert(query.into(), rows);
        self
    }

    /// Load fixtures; `.yaml`/`.yml` files are read as YAML, anything else as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipeError::Decode(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| PipeError::Decode(e.to_string()))
            }
            _ => serde_json::from_str(&content).map_err(|e| PipeError::Decode(e.to_string())),
        }
    }

    pub fn feed_count(&self) -> usize {
        self.sources.len()
    }
}

impl Source for FixtureSource {
    fn open(&self, request: &SourceRequest) -> Result<SourceStream, SourceError> {
        let items = self
            .sources
            .get(&request.url)
            .ok_or_else(|| SourceError::new(format!("unknown url '{}'", request.url)))?;

        Ok(Box::new(items.clone().into_iter().map(Ok)))
    }
}

impl QueryService for FixtureSource {
    fn query(&self, query: &str) -> Result<Vec<Item>, SourceError> {
        self.queries
            .get(query)
            .cloned()
            .ok_or_else(|| SourceError::new(format!("unknown query '{}'", query)))
    }
}
