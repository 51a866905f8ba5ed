//! External collaborators: item sources and query services

pub mod fixture;

use crate::core::Item;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use fixture::FixtureSource;

/// Failure reported by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Lazy sequence of items delivered by a source
pub type SourceStream = Box<dyn Iterator<Item = Result<Item, SourceError>>>;

/// What a fetching module asks a source for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    /// Id of the requesting module
    pub module_id: String,
    /// Type tag of the requesting module
    pub module_type: String,
    pub url: String,
}

/// Trait for item sources - allows for different implementations
pub trait Source: Send + Sync {
    /// Open a lazy sequence of items for a request
    fn open(&self, request: &SourceRequest) -> Result<SourceStream, SourceError>;
}

/// Trait for query services backing the `yql` module
pub trait QueryService: Send + Sync {
    /// Run a query, returning its full result set
    fn query(&self, query: &str) -> Result<Vec<Item>, SourceError>;
}

/// Collaborator that fails every request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSource;

impl Source for NoSource {
    fn open(&self, request: &SourceRequest) -> Result<SourceStream, SourceError> {
        Err(SourceError::new(format!("no source configured for '{}'", request.url)))
    }
}

impl QueryService for NoSource {
    fn query(&self, query: &str) -> Result<Vec<Item>, SourceError> {
        Err(SourceError::new(format!("no query service configured for '{}'", query)))
    }
}

/// Collaborators available to a running pipe
#[derive(Clone)]
pub struct Services {
    pub source: Arc<dyn Source>,
    pub query: Arc<dyn QueryService>,
}

impl Services {
    pub fn new() -> Self {
        Self {
            source: Arc::new(NoSource),
            query: Arc::new(NoSource),
        }
    }

    pub fn with_source<S: Source + 'static>(mut self, source: S) -> Self {
        self.source = Arc::new(source);
        self
    }

    pub fn with_query<Q: QueryService + 'static>(mut self, query: Q) -> Self {
        self.query = Arc::new(query);
        self
    }

    /// Use one value as both source and query service
    pub fn with_fixtures(mut self, fixtures: FixtureSource) -> Self {
        let shared = Arc::new(fixtures);
        self.source = shared.clone();
        self.query = shared;
        self
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
