//! Compile/run context threaded through every call

use crate::execution::CompiledGraph;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// How user-facing inputs are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Text inputs take values supplied by the caller
    #[default]
    Live,
    /// Text inputs always use their declared defaults
    Test,
}

/// Run settings shared by every module of one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,

    /// Emit per-module debug logging
    pub verbose: bool,

    /// Values for `textinput` modules, by input name
    pub inputs: HashMap<String, String>,

    /// Maximum sub-pipe nesting depth
    pub max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Live,
            verbose: false,
            inputs: HashMap::new(),
            max_depth: 64,
        }
    }
}

/// Context for one compile+run invocation
///
/// Holds the run settings and the sub-pipe compile cache. Never shared across
/// invocations.
#[derive(Debug)]
pub struct Context {
    run_id: Uuid,
    settings: Arc<Settings>,
    cache: HashMap<String, Arc<CompiledGraph>>,
    store_lookups: usize,
}

impl Context {
    pub fn new(mode: Mode) -> Self {
        Self::with_settings(Settings {
            mode,
            ..Settings::default()
        })
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            settings: Arc::new(settings),
            cache: HashMap::new(),
            store_lookups: 0,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        Arc::make_mut(&mut self.settings).verbose = verbose;
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.settings)
            .inputs
            .insert(name.into(), value.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        Arc::make_mut(&mut self.settings).max_depth = max_depth;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn shared_settings(&self) -> Arc<Settings> {
        self.settings.clone()
    }

    /// Compiled graph for a pipe id, if resolved earlier in this invocation
    pub fn cached(&self, pipe_id: &str) -> Option<Arc<CompiledGraph>> {
        self.cache.get(pipe_id).cloned()
    }

    pub fn cache_graph(&mut self, pipe_id: &str, graph: Arc<CompiledGraph>) {
        self.cache.insert(pipe_id.to_string(), graph);
    }

    pub fn cached_pipe_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.cache.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of pipe store lookups made through this context
    pub fn store_lookups(&self) -> usize {
        self.store_lookups
    }

    pub fn record_store_lookup(&mut self) {
        self.store_lookups += 1;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Mode::Live)
    }
}
