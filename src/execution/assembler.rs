//! Lazy assembler - turns a compiled graph into one pull-based stream

use crate::core::definition::INPUT_TERMINAL;
use crate::core::{Item, Settings};
use crate::execution::graph::CompiledGraph;
use crate::execution::stream::{self, ItemStream};
use crate::modules::{Inputs, Module};
use crate::services::Services;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a module needs while running
#[derive(Debug, Clone)]
pub struct RunEnv {
    pub services: Services,
    pub settings: Arc<Settings>,
    /// Implicit context item; parameters of unwired modules resolve against it
    pub scope: Item,
    /// Values bound by an embedding pipe for `textinput` modules
    pub bindings: HashMap<String, String>,
}

impl RunEnv {
    pub fn new(services: Services, settings: Arc<Settings>) -> Self {
        Self {
            services,
            settings,
            scope: Item::new(),
            bindings: HashMap::new(),
        }
    }

    pub fn with_scope(&self, scope: Item) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn with_bindings(&self, bindings: HashMap<String, String>) -> Self {
        Self {
            bindings,
            ..self.clone()
        }
    }
}

/// Build the terminal stream of a graph
///
/// Only modules whose output reaches the terminal are materialized. An output
/// read by several modules is shared through a tee so it is computed once.
pub fn assemble(graph: &CompiledGraph, input: ItemStream, env: &RunEnv) -> ItemStream {
    let count = graph.nodes.len();

    let entry_points = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(i, node)| graph.reachable[*i] && matches!(node.module, Module::Input))
        .count();
    let mut entries = stream::tee(input, entry_points);

    let mut outputs: Vec<Vec<ItemStream>> = (0..count).map(|_| Vec::new()).collect();

    for &index in &graph.order {
        if !graph.reachable[index] {
            continue;
        }
        let node = &graph.nodes[index];

        let mut bound = Vec::with_capacity(node.inputs.len() + 1);
        if matches!(node.module, Module::Input) {
            let entry = entries.pop().unwrap_or_else(stream::empty);
            bound.push((INPUT_TERMINAL.to_string(), entry));
        }
        for input in &node.inputs {
            let upstream = outputs[input.source].pop().unwrap_or_else(|| {
                warn!(
                    "Module {} in pipe {} has no stream left for upstream {}",
                    node.id, graph.id, graph.nodes[input.source].id
                );
                stream::empty()
            });
            bound.push((input.terminal.clone(), upstream));
        }

        if env.settings.verbose {
            debug!(
                "Assembling module {} ({}) in pipe {} with {} input(s)",
                node.id,
                node.module.type_name(),
                graph.id,
                bound.len()
            );
        }

        let inputs = Inputs::new(bound);
        let output = if node.param_terminals.is_empty() {
            node.module.open(&node.id, inputs, env)
        } else {
            let (params, inputs) = inputs.split_params(&node.param_terminals);
            node.module.open_bound(&node.id, params, inputs, env)
        };

        let readers = graph.consumers[index] + usize::from(index == graph.terminal);
        outputs[index] = stream::tee(output, readers);
    }

    outputs[graph.terminal].pop().unwrap_or_else(stream::empty)
}
