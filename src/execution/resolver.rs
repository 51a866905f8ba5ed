//! Sub-pipe resolver and graph compiler

use crate::core::definition::INPUT_TERMINAL;
use crate::core::{
    BuiltinType, Context, ModuleConfig, ModuleNode, ModuleType, PipeDefinition, PipeError,
    PipeResult, Wire,
};
use crate::execution::graph::{CompiledGraph, CompiledNode};
use crate::execution::linker::link;
use crate::modules::{Module, SubPipeResolver};
use crate::store::PipeStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Compiles pipe definitions, resolving sub-pipes through a store
pub struct Compiler<'a> {
    store: &'a dyn PipeStore,
}

impl<'a> Compiler<'a> {
    pub fn new(store: &'a dyn PipeStore) -> Self {
        Self { store }
    }

    /// Compile a parsed definition
    pub fn compile(&self, def: &PipeDefinition, ctx: &mut Context) -> PipeResult<Arc<CompiledGraph>> {
        let mut in_progress = Vec::new();
        self.compile_definition(def, ctx, &mut in_progress)
    }

    /// Resolve a pipe by id, reusing the context cache
    pub fn resolve(&self, pipe_id: &str, ctx: &mut Context) -> PipeResult<Arc<CompiledGraph>> {
        let mut in_progress = Vec::new();
        self.resolve_pipe(pipe_id, ctx, &mut in_progress)
    }

    fn resolve_pipe(
        &self,
        pipe_id: &str,
        ctx: &mut Context,
        in_progress: &mut Vec<String>,
    ) -> PipeResult<Arc<CompiledGraph>> {
        if in_progress.iter().any(|id| id == pipe_id) {
            return Err(cyclic(in_progress, pipe_id));
        }

        if let Some(graph) = ctx.cached(pipe_id) {
            debug!("Reusing compiled pipe {}", pipe_id);
            return Ok(graph);
        }

        let limit = ctx.settings().max_depth;
        if in_progress.len() >= limit {
            return Err(PipeError::RecursionLimit {
                pipe: pipe_id.to_string(),
                limit,
            });
        }

        ctx.record_store_lookup();
        let raw = self
            .store
            .lookup(pipe_id)?
            .ok_or_else(|| PipeError::PipeNotFound(pipe_id.to_string()))?;
        let def = PipeDefinition::parse_as(pipe_id, &raw)?;

        let graph = self.compile_definition(&def, ctx, in_progress)?;
        ctx.cache_graph(pipe_id, graph.clone());
        Ok(graph)
    }

    fn compile_definition(
        &self,
        def: &PipeDefinition,
        ctx: &mut Context,
        in_progress: &mut Vec<String>,
    ) -> PipeResult<Arc<CompiledGraph>> {
        if in_progress.iter().any(|id| *id == def.id) {
            return Err(cyclic(in_progress, &def.id));
        }

        in_progress.push(def.id.clone());
        let result = self.build_graph(def, ctx, in_progress);
        in_progress.pop();
        result
    }

    fn build_graph(
        &self,
        def: &PipeDefinition,
        ctx: &mut Context,
        in_progress: &mut Vec<String>,
    ) -> PipeResult<Arc<CompiledGraph>> {
        let linkage = link(def)?;

        let mut resolver = Resolution {
            compiler: self,
            ctx,
            in_progress,
            pipe_id: &def.id,
        };

        let mut nodes = Vec::with_capacity(def.modules.len());
        for (node, inputs) in def.modules.iter().zip(linkage.inputs) {
            let module = Module::compile(node, &mut resolver)?;
            nodes.push(CompiledNode {
                id: node.id.clone(),
                module,
                inputs,
                param_terminals: node.param_terminals(),
            });
        }

        info!(
            "Compiled pipe {} ({} modules, output from {})",
            def.id,
            nodes.len(),
            nodes[linkage.terminal].id
        );

        Ok(Arc::new(CompiledGraph {
            id: def.id.clone(),
            nodes,
            order: linkage.order,
            terminal: linkage.terminal,
            reachable: linkage.reachable,
            consumers: linkage.consumers,
        }))
    }
}

/// Resolution state handed to modules while they compile
struct Resolution<'c, 'a> {
    compiler: &'c Compiler<'a>,
    ctx: &'c mut Context,
    in_progress: &'c mut Vec<String>,
    pipe_id: &'c str,
}

impl SubPipeResolver for Resolution<'_, '_> {
    fn resolve(&mut self, pipe_id: &str) -> PipeResult<Arc<CompiledGraph>> {
        self.compiler.resolve_pipe(pipe_id, self.ctx, self.in_progress)
    }

    fn compile_body(&mut self, owner: &str, body: &ModuleNode) -> PipeResult<Arc<CompiledGraph>> {
        let def = body_definition(self.pipe_id, owner, body);
        self.compiler.compile_definition(&def, self.ctx, self.in_progress)
    }
}

/// Wrap a loop body into a graph fed from an `input` module
///
/// Bodies without an input terminal (sources) make up the whole graph.
fn body_definition(pipe_id: &str, owner: &str, body: &ModuleNode) -> PipeDefinition {
    let mut modules = Vec::with_capacity(2);
    let mut wires = Vec::new();
    if body.module_type.accepts_input() {
        modules.push(ModuleNode::new(
            INPUT_TERMINAL,
            ModuleType::Builtin(BuiltinType::Input),
            ModuleConfig::new(),
        ));
        wires.push(Wire::new(INPUT_TERMINAL, body.id.clone()));
    }
    modules.push(body.clone());

    PipeDefinition {
        id: format!("{}/{}", pipe_id, owner),
        name: None,
        modules,
        wires,
    }
}

fn cyclic(in_progress: &[String], pipe_id: &str) -> PipeError {
    let start = in_progress
        .iter()
        .position(|id| id == pipe_id)
        .unwrap_or(0);
    let mut chain: Vec<String> = in_progress[start..].to_vec();
    chain.push(pipe_id.to_string());
    PipeError::CyclicReference { chain }
}
