//! Loop combinator - drive an embedded body once per outer item

use crate::core::{FieldPath, Item, ModuleNode, PipeError, PipeResult};
use crate::execution::assembler::RunEnv;
use crate::execution::stream::{self, ItemStream};
use crate::execution::CompiledGraph;
use crate::modules::{ConfigReader, SubPipeResolver};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSpec {
    pub body: Arc<CompiledGraph>,
    pub mode: LoopMode,
    /// List field of the outer item to iterate instead of the item itself
    pub over: Option<FieldPath>,
    /// The body reads items; a source body ignores them
    pub body_reads_input: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopMode {
    /// Attach the body's results to the outer item under `key`
    Assign { key: FieldPath, part: AssignPart },
    /// Emit the body's results in place of the outer item
    Emit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignPart {
    All,
    First,
}

impl LoopSpec {
    pub fn compile(
        node: &ModuleNode,
        config: &ConfigReader,
        resolver: &mut dyn SubPipeResolver,
    ) -> PipeResult<Self> {
        let embed = node
            .embed
            .as_deref()
            .ok_or_else(|| config.error("loop has no embedded module"))?;

        let mode = match config.literal_str("mode")?.as_deref().map(str::to_ascii_lowercase) {
            None => LoopMode::Assign {
                key: assign_key(config, embed)?,
                part: assign_part(config)?,
            },
            Some(mode) if mode == "assign" => LoopMode::Assign {
                key: assign_key(config, embed)?,
                part: assign_part(config)?,
            },
            Some(mode) if mode == "emit" => LoopMode::Emit,
            Some(mode) => return Err(config.error(format!("unknown loop mode '{}'", mode))),
        };

        let over = match config.path("over")? {
            Some(path) => Some(path),
            None => config.path("with")?,
        };

        let body = resolver.compile_body(&node.id, embed)?;

        Ok(Self {
            body,
            mode,
            over,
            body_reads_input: embed.module_type.accepts_input(),
        })
    }

    pub fn open(&self, id: &str, input: ItemStream, env: &RunEnv) -> ItemStream {
        let spec = self.clone();
        let env = env.clone();
        let id = id.to_string();
        Box::new(input.enumerate().flat_map(move |(index, result)| match result {
            Ok(item) => spec.run_once(&id, index, item, &env),
            Err(e) => stream::failed(e),
        }))
    }

    /// Drive the body for one outer item
    fn run_once(&self, id: &str, index: usize, item: Item, env: &RunEnv) -> ItemStream {
        let wrap = |source: PipeError| PipeError::LoopItem {
            module: id.to_string(),
            index,
            source: Box::new(source),
        };

        let feed = match &self.over {
            None => vec![item.clone()],
            Some(path) => match item.lookup(path) {
                Ok(Value::Array(list)) => list.iter().cloned().map(Item::wrap).collect(),
                Ok(value) => vec![Item::wrap(value.clone())],
                Err(e) => return stream::failed(wrap(e.into())),
            },
        };

        // A source body over a list yields the list itself
        let results = if self.over.is_some() && !self.body_reads_input {
            stream::from_items(feed)
        } else {
            if env.settings.verbose {
                debug!("Loop {} driving body {} for item {}", id, self.body.id(), index);
            }
            Box::new(self.body.drive(stream::from_items(feed), &env.with_scope(item.clone()))) as ItemStream
        };

        match &self.mode {
            LoopMode::Emit => {
                let module = id.to_string();
                Box::new(results.map(move |result| {
                    result.map_err(|source| PipeError::LoopItem {
                        module: module.clone(),
                        index,
                        source: Box::new(source),
                    })
                })) as ItemStream
            }
            LoopMode::Assign { key, part } => {
                let limit = match part {
                    AssignPart::All => usize::MAX,
                    AssignPart::First => 1,
                };
                let mut collected = Vec::new();
                for result in results.take(limit) {
                    match result {
                        Ok(inner) => collected.push(Value::from(inner)),
                        Err(e) => return stream::failed(wrap(e)),
                    }
                }

                let mut item = item;
                item.remove_path(key);
                match collected.len() {
                    0 => {}
                    1 => item.set_path(key, collected.remove(0)),
                    _ => item.set_path(key, Value::Array(collected)),
                }
                stream::once(Ok(item))
            }
        }
    }
}

fn assign_key(config: &ConfigReader, embed: &ModuleNode) -> PipeResult<FieldPath> {
    Ok(config
        .path("assign_to")?
        .unwrap_or_else(|| FieldPath::key(format!("loop:{}", embed.module_type))))
}

fn assign_part(config: &ConfigReader) -> PipeResult<AssignPart> {
    match config.literal_str("assign_part")?.as_deref().map(str::to_ascii_lowercase) {
        None => Ok(AssignPart::All),
        Some(part) if part == "all" => Ok(AssignPart::All),
        Some(part) if part == "first" => Ok(AssignPart::First),
        Some(part) => Err(config.error(format!("unknown assign_part '{}'", part))),
    }
}
