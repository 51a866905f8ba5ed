//! pipegraph - compile Pipes-style dataflow graphs into lazy item streams

pub mod cli;
pub mod core;
pub mod execution;
pub mod modules;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use core::{Context, FieldPath, Item, Mode, PipeDefinition, PipeError, PipeResult, RawPipe};
pub use execution::{CompiledGraph, CompiledPipeline, PipeEngine};
pub use services::{FixtureSource, QueryService, Services, Source};
pub use store::{DirectoryPipeStore, InMemoryPipeStore, PipeStore};
