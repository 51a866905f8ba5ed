//! Pipe compilation and lazy execution

pub mod assembler;
pub mod engine;
pub mod graph;
pub mod linker;
pub mod resolver;
pub mod stream;

pub use assembler::RunEnv;
pub use engine::{EngineEvent, EventHandler, PipeEngine};
pub use graph::{CompiledGraph, CompiledNode, CompiledPipeline};
pub use linker::{link, BoundInput, Linkage};
pub use resolver::Compiler;
pub use stream::ItemStream;
