//! Pipe stores: where sub-pipe definitions are looked up by id

pub mod directory;

pub use directory::DirectoryPipeStore;

use crate::core::{PipeResult, RawPipe};
use std::collections::HashMap;

/// Trait for pipe stores
pub trait PipeStore: Send + Sync {
    /// Look up a pipe definition by id; `None` when the store has no such pipe
    fn lookup(&self, pipe_id: &str) -> PipeResult<Option<RawPipe>>;
}

impl<S: PipeStore + ?Sized> PipeStore for &S {
    fn lookup(&self, pipe_id: &str) -> PipeResult<Option<RawPipe>> {
        (**self).lookup(pipe_id)
    }
}

/// In-memory store (for testing or embedding)
#[derive(Debug, Clone, Default)]
pub struct InMemoryPipeStore {
    pipes: HashMap<String, RawPipe>,
}

impl InMemoryPipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pipe_id: impl Into<String>, pipe: RawPipe) {
        self.pipes.insert(pipe_id.into(), pipe);
    }

    pub fn with_pipe(mut self, pipe_id: impl Into<String>, pipe: RawPipe) -> Self {
        self.insert(pipe_id, pipe);
        self
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }
}

impl PipeStore for InMemoryPipeStore {
    fn lookup(&self, pipe_id: &str) -> PipeResult<Option<RawPipe>> {
        Ok(self.pipes.get(pipe_id).cloned())
    }
}
