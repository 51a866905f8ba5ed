//! Test utility functions for pipegraph

#![allow(dead_code)]

use pipegraph::core::{Context, Item, PipeResult, RawPipe};
use pipegraph::execution::PipeEngine;
use pipegraph::services::{FixtureSource, Source, SourceError, SourceRequest, SourceStream};
use pipegraph::store::{InMemoryPipeStore, PipeStore};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source that serves fixtures and counts what is opened and pulled
#[derive(Clone)]
pub struct CountingSource {
    fixtures: Arc<FixtureSource>,
    opened: Arc<AtomicUsize>,
    pulled: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(fixtures: FixtureSource) -> Self {
        Self {
            fixtures: Arc::new(fixtures),
            opened: Arc::new(AtomicUsize::new(0)),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of source requests made
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of items read from all sources
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

impl Source for CountingSource {
    fn open(&self, request: &SourceRequest) -> Result<SourceStream, SourceError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let pulled = self.pulled.clone();
        let items = self.fixtures.open(request)?;
        Ok(Box::new(items.inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        })))
    }
}

/// Pipe store that counts lookups
pub struct CountingStore {
    inner: InMemoryPipeStore,
    lookups: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new(inner: InMemoryPipeStore) -> Self {
        Self {
            inner,
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl PipeStore for CountingStore {
    fn lookup(&self, pipe_id: &str) -> PipeResult<Option<RawPipe>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(pipe_id)
    }
}

/// Decode a pipe document written with `json!`
pub fn pipe(value: Value) -> RawPipe {
    RawPipe::from_value(value).expect("pipe document should decode")
}

/// Feed items from `json!` values
pub fn feed(values: Vec<Value>) -> Vec<Item> {
    values.into_iter().map(Item::wrap).collect()
}

/// Items with just a title
pub fn titled(titles: &[&str]) -> Vec<Item> {
    titles
        .iter()
        .map(|t| Item::wrap(serde_json::json!({ "title": t })))
        .collect()
}

/// Compile and fully drain a pipe
pub fn run_to_end<S: PipeStore>(
    engine: &PipeEngine<S>,
    raw: &RawPipe,
    ctx: &mut Context,
) -> PipeResult<Vec<PipeResult<Value>>> {
    let pipeline = engine.build(raw, ctx)?;
    Ok(pipeline.map(|result| result.map(Value::from)).collect())
}

/// Compile and drain a pipe that must not yield errors
pub fn run_ok<S: PipeStore>(engine: &PipeEngine<S>, raw: &RawPipe) -> Vec<Value> {
    let mut ctx = Context::default();
    run_to_end(engine, raw, &mut ctx)
        .expect("pipe should compile")
        .into_iter()
        .map(|result| result.expect("item should not be an error"))
        .collect()
}

/// Title of each item, empty when absent
pub fn titles(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .map(|v| v["title"].as_str().unwrap_or_default().to_string())
        .collect()
}
