//! Compiled pipe graphs and the pipelines driven from them

use crate::core::{Item, PipeResult};
use crate::execution::assembler::{assemble, RunEnv};
use crate::execution::linker::BoundInput;
use crate::execution::stream::ItemStream;
use crate::modules::Module;
use tracing::debug;

/// One compiled module with its bound inputs
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledNode {
    pub id: String,
    pub module: Module,
    pub inputs: Vec<BoundInput>,
    /// Input terminals that feed parameters instead of items
    pub param_terminals: Vec<String>,
}

/// A linked, compiled pipe
///
/// Nodes are stored in declaration order and referenced by index. Sub-pipes
/// and loop bodies are held as shared compiled graphs, so one compilation can
/// be driven any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledGraph {
    pub(crate) id: String,
    pub(crate) nodes: Vec<CompiledNode>,
    pub(crate) order: Vec<usize>,
    pub(crate) terminal: usize,
    pub(crate) reachable: Vec<bool>,
    pub(crate) consumers: Vec<usize>,
}

impl CompiledGraph {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&CompiledNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Module ids in execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.nodes[i].id.as_str()).collect()
    }

    pub fn terminal_id(&self) -> &str {
        &self.nodes[self.terminal].id
    }

    /// Whether a module's output contributes to the pipe output
    pub fn is_reachable(&self, id: &str) -> bool {
        self.nodes
            .iter()
            .position(|node| node.id == id)
            .is_some_and(|i| self.reachable[i])
    }

    /// Drive a fresh instance of this graph
    ///
    /// `input` feeds the graph's `input` modules. Nothing is pulled until the
    /// returned pipeline is.
    pub fn drive(&self, input: ItemStream, env: &RunEnv) -> CompiledPipeline {
        CompiledPipeline::new(self.id.clone(), assemble(self, input, env))
    }
}

/// One running instance of a compiled graph: a lazy, at-most-once sequence
pub struct CompiledPipeline {
    pipe_id: String,
    stream: ItemStream,
    exhausted: bool,
    pulled: usize,
}

impl CompiledPipeline {
    pub fn new(pipe_id: String, stream: ItemStream) -> Self {
        Self {
            pipe_id,
            stream,
            exhausted: false,
            pulled: 0,
        }
    }

    pub fn pipe_id(&self) -> &str {
        &self.pipe_id
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of results (items or errors) pulled so far
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    pub fn into_stream(self) -> ItemStream {
        Box::new(self)
    }
}

impl Iterator for CompiledPipeline {
    type Item = PipeResult<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        match self.stream.next() {
            Some(result) => {
                self.pulled += 1;
                Some(result)
            }
            None => {
                self.exhausted = true;
                debug!("Pipe {} exhausted after {} results", self.pipe_id, self.pulled);
                None
            }
        }
    }
}

impl std::fmt::Debug for CompiledPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledPipeline")
            .field("pipe_id", &self.pipe_id)
            .field("exhausted", &self.exhausted)
            .field("pulled", &self.pulled)
            .finish()
    }
}
