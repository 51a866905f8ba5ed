//! Pipe engine - compiles definitions and runs compiled graphs

use crate::{
    core::{Context, PipeDefinition, PipeResult, RawPipe},
    execution::{assembler::RunEnv, stream, CompiledGraph, CompiledPipeline, Compiler},
    services::{FixtureSource, QueryService, Services, Source},
    store::PipeStore,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Events emitted while compiling and starting pipes
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PipeCompiled {
        run_id: Uuid,
        pipe_id: String,
        modules: usize,
        cached_pipes: usize,
    },
    RunStarted {
        run_id: Uuid,
        pipe_id: String,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Entry point for compiling and running pipes
pub struct PipeEngine<S> {
    store: S,
    services: Services,
    event_handlers: Vec<EventHandler>,
}

impl<S: PipeStore> PipeEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            services: Services::default(),
            event_handlers: Vec::new(),
        }
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn with_source<T: Source + 'static>(mut self, source: T) -> Self {
        self.services = self.services.with_source(source);
        self
    }

    pub fn with_query<Q: QueryService + 'static>(mut self, query: Q) -> Self {
        self.services = self.services.with_query(query);
        self
    }

    pub fn with_fixtures(mut self, fixtures: FixtureSource) -> Self {
        self.services = self.services.with_fixtures(fixtures);
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit_event(&self, event: EngineEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Parse and compile a decoded document
    ///
    /// Every structural error is raised here, before any item is pulled.
    pub fn compile(&self, raw: &RawPipe, ctx: &mut Context) -> PipeResult<Arc<CompiledGraph>> {
        let def = PipeDefinition::parse(raw)?;
        self.compile_definition(&def, ctx)
    }

    pub fn compile_definition(
        &self,
        def: &PipeDefinition,
        ctx: &mut Context,
    ) -> PipeResult<Arc<CompiledGraph>> {
        let graph = Compiler::new(&self.store).compile(def, ctx)?;

        self.emit_event(EngineEvent::PipeCompiled {
            run_id: ctx.run_id(),
            pipe_id: graph.id().to_string(),
            modules: graph.len(),
            cached_pipes: ctx.cached_pipe_ids().len(),
        });
        Ok(graph)
    }

    /// Compile a pipe known to the store by id
    pub fn compile_stored(&self, pipe_id: &str, ctx: &mut Context) -> PipeResult<Arc<CompiledGraph>> {
        let graph = Compiler::new(&self.store).resolve(pipe_id, ctx)?;

        self.emit_event(EngineEvent::PipeCompiled {
            run_id: ctx.run_id(),
            pipe_id: graph.id().to_string(),
            modules: graph.len(),
            cached_pipes: ctx.cached_pipe_ids().len(),
        });
        Ok(graph)
    }

    /// Start a lazy run of a compiled graph
    ///
    /// Nothing is fetched until the returned pipeline is pulled. Dropping it
    /// cancels the run.
    pub fn run(&self, graph: &CompiledGraph, ctx: &Context) -> CompiledPipeline {
        info!("Starting run {} of pipe {}", ctx.run_id(), graph.id());
        self.emit_event(EngineEvent::RunStarted {
            run_id: ctx.run_id(),
            pipe_id: graph.id().to_string(),
        });

        let env = RunEnv::new(self.services.clone(), ctx.shared_settings());
        graph.drive(stream::empty(), &env)
    }

    /// Compile and start a run in one step
    pub fn build(&self, raw: &RawPipe, ctx: &mut Context) -> PipeResult<CompiledPipeline> {
        let graph = self.compile(raw, ctx)?;
        Ok(self.run(&graph, ctx))
    }
}
