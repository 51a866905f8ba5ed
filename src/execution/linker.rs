//! Topological linker - orders modules and binds their inputs

use crate::core::{BuiltinType, PipeDefinition, PipeError, PipeResult};
use std::collections::BTreeSet;

/// One bound input of a module: the upstream node feeding a terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInput {
    pub terminal: String,
    /// Index of the upstream module in declaration order
    pub source: usize,
}

/// Result of linking one pipe definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linkage {
    /// Module indices in execution order
    pub order: Vec<usize>,
    /// Per module, its bound inputs in wire declaration order
    pub inputs: Vec<Vec<BoundInput>>,
    /// Index of the module whose output is the pipe's output
    pub terminal: usize,
    /// Per module, whether its output reaches the terminal
    pub reachable: Vec<bool>,
    /// Per module, how many reachable modules consume its output
    pub consumers: Vec<usize>,
}

/// Link a definition
///
/// Uses Kahn's algorithm with ties broken by declaration order, so the same
/// definition always yields the same order.
pub fn link(def: &PipeDefinition) -> PipeResult<Linkage> {
    let count = def.modules.len();
    if count == 0 {
        return Err(PipeError::definition(format!("pipe '{}' has no modules", def.id)));
    }

    let mut inputs: Vec<Vec<BoundInput>> = vec![Vec::new(); count];
    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut in_degree = vec![0usize; count];

    for wire in &def.wires {
        let source = index_of(def, &wire.source)?;
        let target = index_of(def, &wire.target)?;
        inputs[target].push(BoundInput {
            terminal: wire.target_terminal.clone(),
            source,
        });
        downstream[source].push(target);
        in_degree[target] += 1;
    }

    let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(count);

    while let Some(index) = ready.pop_first() {
        order.push(index);
        for &next in &downstream[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() < count {
        let stuck = (0..count).find(|&i| in_degree[i] > 0).unwrap_or(0);
        return Err(PipeError::Cycle {
            pipe: def.id.clone(),
            module: def.modules[stuck].id.clone(),
        });
    }

    let terminal = find_terminal(def, &downstream)?;

    let mut reachable = vec![false; count];
    let mut pending = vec![terminal];
    while let Some(index) = pending.pop() {
        if reachable[index] {
            continue;
        }
        reachable[index] = true;
        pending.extend(inputs[index].iter().map(|bound| bound.source));
    }

    let mut consumers = vec![0usize; count];
    for (index, bound) in inputs.iter().enumerate() {
        if reachable[index] {
            for input in bound {
                consumers[input.source] += 1;
            }
        }
    }

    Ok(Linkage {
        order,
        inputs,
        terminal,
        reachable,
        consumers,
    })
}

fn index_of(def: &PipeDefinition, id: &str) -> PipeResult<usize> {
    def.position(id).ok_or_else(|| {
        PipeError::definition(format!(
            "pipe '{}': wire references non-existent module '{}'",
            def.id, id
        ))
    })
}

/// The `output` module if declared, otherwise the only module nothing consumes
fn find_terminal(def: &PipeDefinition, downstream: &[Vec<usize>]) -> PipeResult<usize> {
    let outputs: Vec<usize> = def
        .modules
        .iter()
        .enumerate()
        .filter(|(_, m)| m.module_type.is_builtin(BuiltinType::Output))
        .map(|(i, _)| i)
        .collect();

    match outputs.as_slice() {
        [single] => return Ok(*single),
        [] => {}
        _ => {
            return Err(PipeError::definition(format!(
                "pipe '{}' declares {} output modules",
                def.id,
                outputs.len()
            )))
        }
    }

    let sinks: Vec<usize> = (0..def.modules.len())
        .filter(|&i| downstream[i].is_empty())
        .collect();

    match sinks.as_slice() {
        [single] => Ok(*single),
        _ => Err(PipeError::definition(format!(
            "pipe '{}' has no output module and {} unconnected outputs ({})",
            def.id,
            sinks.len(),
            sinks
                .iter()
                .map(|&i| def.modules[i].id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
