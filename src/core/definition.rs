//! Pipe definition graph and the parser that builds it

use crate::core::config::{RawModule, RawPipe};
use crate::core::error::{PipeError, PipeResult};
use crate::core::param::{ModuleConfig, ParamValue};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Output terminal of every module
pub const OUTPUT_TERMINAL: &str = "_OUTPUT";

/// Default input terminal
pub const INPUT_TERMINAL: &str = "_INPUT";

/// Prefix of module types that reference another pipe
pub const SUBPIPE_PREFIX: &str = "pipe:";

/// Built-in module types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Fetch,
    FetchData,
    Input,
    TextInput,
    Output,
    Filter,
    Sort,
    Truncate,
    Tail,
    Reverse,
    Count,
    Union,
    Uniq,
    Rename,
    ItemBuilder,
    RssItemBuilder,
    UrlBuilder,
    Regex,
    Yql,
    Loop,
}

const BUILTINS: &[(&str, BuiltinType)] = &[
    ("fetch", BuiltinType::Fetch),
    ("fetchdata", BuiltinType::FetchData),
    ("input", BuiltinType::Input),
    ("textinput", BuiltinType::TextInput),
    ("output", BuiltinType::Output),
    ("filter", BuiltinType::Filter),
    ("sort", BuiltinType::Sort),
    ("truncate", BuiltinType::Truncate),
    ("tail", BuiltinType::Tail),
    ("reverse", BuiltinType::Reverse),
    ("count", BuiltinType::Count),
    ("union", BuiltinType::Union),
    ("uniq", BuiltinType::Uniq),
    ("rename", BuiltinType::Rename),
    ("itembuilder", BuiltinType::ItemBuilder),
    ("rssitembuilder", BuiltinType::RssItemBuilder),
    ("urlbuilder", BuiltinType::UrlBuilder),
    ("regex", BuiltinType::Regex),
    ("yql", BuiltinType::Yql),
    ("loop", BuiltinType::Loop),
];

impl BuiltinType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        BUILTINS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, builtin)| *builtin)
    }

    pub fn tag(&self) -> &'static str {
        BUILTINS
            .iter()
            .find(|(_, builtin)| builtin == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

/// Which input terminals a module accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTerminals {
    /// Sources: no input
    None,
    /// Only `_INPUT`, possibly with several fan-in wires
    Single,
    /// Any terminal name (`_INPUT`, `_OTHER`, ...)
    Any,
}

/// Type tag of a module node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleType {
    Builtin(BuiltinType),
    /// Reference to another pipe by id
    SubPipe(String),
}

impl ModuleType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.strip_prefix(SUBPIPE_PREFIX) {
            Some(pipe_id) if !pipe_id.is_empty() => Some(ModuleType::SubPipe(pipe_id.to_string())),
            Some(_) => None,
            None => BuiltinType::from_tag(tag).map(ModuleType::Builtin),
        }
    }

    pub fn input_terminals(&self) -> InputTerminals {
        match self {
            ModuleType::SubPipe(_) => InputTerminals::Single,
            ModuleType::Builtin(builtin) => match builtin {
                BuiltinType::Fetch
                | BuiltinType::FetchData
                | BuiltinType::TextInput
                | BuiltinType::Input => InputTerminals::None,
                BuiltinType::Union => InputTerminals::Any,
                _ => InputTerminals::Single,
            },
        }
    }

    pub fn accepts_input(&self) -> bool {
        self.input_terminals() != InputTerminals::None
    }

    pub fn is_builtin(&self, builtin: BuiltinType) -> bool {
        matches!(self, ModuleType::Builtin(b) if *b == builtin)
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleType::Builtin(builtin) => write!(f, "{}", builtin.tag()),
            ModuleType::SubPipe(pipe_id) => write!(f, "{}{}", SUBPIPE_PREFIX, pipe_id),
        }
    }
}

/// One node of the pipe graph
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleNode {
    pub id: String,
    pub module_type: ModuleType,
    pub config: ModuleConfig,
    /// Body of a loop module
    pub embed: Option<Box<ModuleNode>>,
}

impl ModuleNode {
    pub fn new(id: impl Into<String>, module_type: ModuleType, config: ModuleConfig) -> Self {
        Self {
            id: id.into(),
            module_type,
            config,
            embed: None,
        }
    }

    /// Terminals wired into parameters rather than into the item input
    pub fn param_terminals(&self) -> Vec<String> {
        self.config.terminals()
    }
}

/// Directed edge from a module output to an input terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub source: String,
    pub source_terminal: String,
    pub target: String,
    pub target_terminal: String,
}

impl Wire {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_terminal: OUTPUT_TERMINAL.to_string(),
            target: target.into(),
            target_terminal: INPUT_TERMINAL.to_string(),
        }
    }
}

/// Validated pipe graph
#[derive(Debug, Clone, PartialEq)]
pub struct PipeDefinition {
    pub id: String,
    pub name: Option<String>,
    pub modules: Vec<ModuleNode>,
    pub wires: Vec<Wire>,
}

impl PipeDefinition {
    /// Parse a decoded document, using its own id (or `anonymous`)
    pub fn parse(raw: &RawPipe) -> PipeResult<Self> {
        let id = raw.id.clone().unwrap_or_else(|| "anonymous".to_string());
        Self::parse_as(&id, raw)
    }

    /// Parse a decoded document under an explicit pipe id
    pub fn parse_as(id: &str, raw: &RawPipe) -> PipeResult<Self> {
        let modules = raw
            .modules
            .iter()
            .map(parse_module)
            .collect::<PipeResult<Vec<_>>>()?;

        let wires = raw
            .wires
            .iter()
            .map(|wire| Wire {
                source: wire.src.moduleid.clone(),
                source_terminal: wire.src.id.clone().unwrap_or_else(|| OUTPUT_TERMINAL.to_string()),
                target: wire.tgt.moduleid.clone(),
                target_terminal: wire.tgt.id.clone().unwrap_or_else(|| INPUT_TERMINAL.to_string()),
            })
            .collect();

        let definition = Self {
            id: id.to_string(),
            name: raw.name.clone(),
            modules,
            wires,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Check id uniqueness and wire endpoints
    pub fn validate(&self) -> PipeResult<()> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.id.as_str()) {
                return Err(PipeError::definition(format!(
                    "pipe '{}': duplicate module id '{}'",
                    self.id, module.id
                )));
            }
        }

        for wire in &self.wires {
            if self.module(&wire.source).is_none() {
                return Err(PipeError::definition(format!(
                    "pipe '{}': wire references non-existent module '{}'",
                    self.id, wire.source
                )));
            }
            if wire.source_terminal != OUTPUT_TERMINAL {
                return Err(PipeError::definition(format!(
                    "pipe '{}': module '{}' has no output terminal '{}'",
                    self.id, wire.source, wire.source_terminal
                )));
            }

            let target = self.module(&wire.target).ok_or_else(|| {
                PipeError::definition(format!(
                    "pipe '{}': wire references non-existent module '{}'",
                    self.id, wire.target
                ))
            })?;

            let accepted = match target.module_type.input_terminals() {
                InputTerminals::None => false,
                InputTerminals::Single => wire.target_terminal == INPUT_TERMINAL,
                InputTerminals::Any => true,
            } || target.param_terminals().contains(&wire.target_terminal);
            if !accepted {
                return Err(PipeError::definition(format!(
                    "pipe '{}': module '{}' ({}) has no input terminal '{}'",
                    self.id, target.id, target.module_type, wire.target_terminal
                )));
            }
        }

        Ok(())
    }

    pub fn module(&self, id: &str) -> Option<&ModuleNode> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.id == id)
    }

    /// Ids of all pipes referenced by this one, loop bodies included
    pub fn sub_pipe_ids(&self) -> Vec<&str> {
        fn collect<'a>(node: &'a ModuleNode, ids: &mut Vec<&'a str>) {
            if let ModuleType::SubPipe(pipe_id) = &node.module_type {
                ids.push(pipe_id);
            }
            if let Some(embed) = &node.embed {
                collect(embed, ids);
            }
        }

        let mut ids = Vec::new();
        for module in &self.modules {
            collect(module, &mut ids);
        }
        ids
    }
}

fn parse_module(raw: &RawModule) -> PipeResult<ModuleNode> {
    let module_type = ModuleType::parse(&raw.module_type).ok_or_else(|| {
        PipeError::definition(format!(
            "module '{}' has unrecognized type '{}'",
            raw.id, raw.module_type
        ))
    })?;

    let mut config = ModuleConfig::new();
    let mut embed = None;

    for (name, value) in &raw.conf {
        if module_type.is_builtin(BuiltinType::Loop) && name == "embed" {
            embed = Some(Box::new(parse_embed(&raw.id, value)?));
            continue;
        }

        let param = ParamValue::decode(value).map_err(|e| {
            PipeError::definition(format!("module '{}' parameter '{}': {}", raw.id, name, e))
        })?;
        config = config.with(name.clone(), param);
    }

    if module_type.is_builtin(BuiltinType::Loop) && embed.is_none() {
        return Err(PipeError::definition(format!(
            "loop module '{}' has no embedded module",
            raw.id
        )));
    }

    Ok(ModuleNode {
        id: raw.id.clone(),
        module_type,
        config,
        embed,
    })
}

/// Loop bodies come as `{"value": {module}}` or as the bare module
fn parse_embed(loop_id: &str, value: &Value) -> PipeResult<ModuleNode> {
    let body = value.get("value").unwrap_or(value);
    let raw: RawModule = serde_json::from_value(body.clone()).map_err(|e| {
        PipeError::definition(format!("loop module '{}' has a malformed body: {}", loop_id, e))
    })?;
    parse_module(&raw)
}
