//! CLI output formatting

use crate::core::{Item, PipeError};
use crate::execution::{CompiledGraph, EngineEvent};
use console::Emoji;
use serde_json::json;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// One item as a single JSON line
pub fn format_item(item: &Item) -> String {
    serde_json::to_string(item).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Format an item error for display
pub fn format_item_error(position: usize, error: &PipeError) -> String {
    format!(
        "{} item {}: {}",
        WARN,
        style(position).dim(),
        style(error).yellow()
    )
}

/// Format an engine event for display
pub fn format_engine_event(event: &EngineEvent) -> String {
    match event {
        EngineEvent::PipeCompiled {
            pipe_id,
            modules,
            cached_pipes,
            ..
        } => format!(
            "{} Compiled {} ({} modules, {} sub-pipes)",
            CHECK,
            style(pipe_id).bold(),
            style(modules).cyan(),
            style(cached_pipes).cyan()
        ),
        EngineEvent::RunStarted { run_id, pipe_id } => format!(
            "{} Running {} ({})",
            ROCKET,
            style(pipe_id).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
    }
}

/// Execution order with one line per module
pub fn format_execution_order(graph: &CompiledGraph) -> String {
    graph
        .execution_order()
        .iter()
        .enumerate()
        .map(|(position, id)| {
            let node = graph.node(id);
            let type_name = node.map(|n| n.module.type_name()).unwrap_or("?");
            let mut line = format!("  {:>2}. {} ({})", position + 1, style(id).bold(), type_name);
            if node.is_some_and(|n| n.module.is_buffering()) {
                line.push_str(&format!(" {}", style("[buffers]").yellow()));
            }
            if !graph.is_reachable(id) {
                line.push_str(&format!(" {}", style("[unused]").dim()));
            }
            if *id == graph.terminal_id() {
                line.push_str(&format!(" {}", style("<- output").green()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Machine-readable summary of a compiled graph
pub fn execution_order_json(graph: &CompiledGraph) -> serde_json::Value {
    let modules: Vec<serde_json::Value> = graph
        .execution_order()
        .iter()
        .map(|id| {
            let node = graph.node(id);
            json!({
                "id": id,
                "type": node.map(|n| n.module.type_name()),
                "buffering": node.is_some_and(|n| n.module.is_buffering()),
                "reachable": graph.is_reachable(id),
            })
        })
        .collect();

    json!({
        "pipe": graph.id(),
        "output": graph.terminal_id(),
        "modules": modules,
    })
}
