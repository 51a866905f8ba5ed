//! Module library
//!
//! Every module type compiles into one variant of [`Module`]. Compiling checks
//! the configuration; opening turns the bound inputs into a lazy output stream.

pub mod builder;
pub mod fetch;
pub mod filter;
pub mod input;
pub mod looping;
pub mod regex;
pub mod rename;
pub mod sequence;
pub mod sort;
pub mod subpipe;
pub mod urlbuilder;
pub mod yql;

pub use builder::BuilderSpec;
pub use fetch::{FetchDataSpec, FetchSpec};
pub use filter::FilterSpec;
pub use input::TextInputSpec;
pub use looping::{AssignPart, LoopMode, LoopSpec};
pub use regex::RegexSpec;
pub use rename::RenameSpec;
pub use sort::SortSpec;
pub use subpipe::SubPipeSpec;
pub use urlbuilder::UrlBuilderSpec;
pub use yql::YqlSpec;

use crate::core::{
    BuiltinType, FieldPath, Item, ModuleConfig, ModuleNode, ModuleType, ParamValue, PipeError,
    PipeResult,
};
use crate::execution::assembler::RunEnv;
use crate::execution::stream::{self, ItemStream};
use crate::execution::CompiledGraph;
use ::regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Hands compiled sub-pipes and loop bodies to modules while they compile
pub trait SubPipeResolver {
    /// Compile (or reuse) the pipe with the given id
    fn resolve(&mut self, pipe_id: &str) -> PipeResult<Arc<CompiledGraph>>;

    /// Compile the embedded body of the loop module `owner`
    fn compile_body(&mut self, owner: &str, body: &ModuleNode) -> PipeResult<Arc<CompiledGraph>>;
}

/// A compiled module
#[derive(Debug, Clone, PartialEq)]
pub enum Module {
    Fetch(FetchSpec),
    FetchData(FetchDataSpec),
    Input,
    TextInput(TextInputSpec),
    Output,
    Filter(FilterSpec),
    Sort(SortSpec),
    Truncate(usize),
    Tail(usize),
    Reverse,
    Count,
    Union,
    Uniq(FieldPath),
    Rename(RenameSpec),
    ItemBuilder(BuilderSpec),
    RssItemBuilder(BuilderSpec),
    UrlBuilder(UrlBuilderSpec),
    Regex(RegexSpec),
    Yql(YqlSpec),
    Loop(LoopSpec),
    SubPipe(SubPipeSpec),
}

impl Module {
    /// Compile a module node, resolving any pipes it references
    pub fn compile(node: &ModuleNode, resolver: &mut dyn SubPipeResolver) -> PipeResult<Self> {
        let config = ConfigReader::new(&node.id, &node.config);

        let builtin = match &node.module_type {
            ModuleType::SubPipe(pipe_id) => {
                return Ok(Module::SubPipe(SubPipeSpec::compile(pipe_id, &config, resolver)?));
            }
            ModuleType::Builtin(builtin) => *builtin,
        };

        let module = match builtin {
            BuiltinType::Fetch => Module::Fetch(FetchSpec::compile(&config)?),
            BuiltinType::FetchData => Module::FetchData(FetchDataSpec::compile(&config)?),
            BuiltinType::Input => Module::Input,
            BuiltinType::TextInput => Module::TextInput(TextInputSpec::compile(&config)?),
            BuiltinType::Output => Module::Output,
            BuiltinType::Filter => Module::Filter(FilterSpec::compile(&config)?),
            BuiltinType::Sort => Module::Sort(SortSpec::compile(&config)?),
            BuiltinType::Truncate => Module::Truncate(config.required_count("count")?),
            BuiltinType::Tail => Module::Tail(config.required_count("count")?),
            BuiltinType::Reverse => Module::Reverse,
            BuiltinType::Count => Module::Count,
            BuiltinType::Union => Module::Union,
            BuiltinType::Uniq => Module::Uniq(config.required_path("field")?),
            BuiltinType::Rename => Module::Rename(RenameSpec::compile(&config)?),
            BuiltinType::ItemBuilder => Module::ItemBuilder(BuilderSpec::item_builder(&config)?),
            BuiltinType::RssItemBuilder => {
                Module::RssItemBuilder(BuilderSpec::rss_item_builder(&config)?)
            }
            BuiltinType::UrlBuilder => Module::UrlBuilder(UrlBuilderSpec::compile(&config)?),
            BuiltinType::Regex => Module::Regex(RegexSpec::compile(&config)?),
            BuiltinType::Yql => Module::Yql(YqlSpec::compile(&config)?),
            BuiltinType::Loop => Module::Loop(LoopSpec::compile(node, &config, resolver)?),
        };

        Ok(module)
    }

    /// Open the module's output stream over its bound inputs
    pub fn open(&self, id: &str, inputs: Inputs, env: &RunEnv) -> ItemStream {
        match self {
            Module::Fetch(spec) => spec.open(id, env),
            Module::FetchData(spec) => spec.open(id, env),
            Module::Input | Module::Output | Module::Union => inputs.take_all(),
            Module::TextInput(spec) => spec.open(id, env),
            Module::Filter(spec) => spec.open(inputs.take_all()),
            Module::Sort(spec) => spec.open(inputs.take_all()),
            Module::Truncate(count) => sequence::truncate(inputs.take_all(), *count),
            Module::Tail(count) => sequence::tail(inputs.take_all(), *count),
            Module::Reverse => sequence::reverse(inputs.take_all()),
            Module::Count => sequence::count(inputs.take_all()),
            Module::Uniq(field) => sequence::uniq(inputs.take_all(), field.clone()),
            Module::Rename(spec) => spec.open(inputs.take_all()),
            Module::ItemBuilder(spec) | Module::RssItemBuilder(spec) => spec.open(inputs, env),
            Module::UrlBuilder(spec) => spec.open(id, inputs, env),
            Module::Regex(spec) => spec.open(inputs.take_all()),
            Module::Yql(spec) => spec.open(id, inputs, env),
            Module::Loop(spec) => spec.open(id, inputs.take_all(), env),
            Module::SubPipe(spec) => spec.open(inputs.take_all(), env),
        }
    }

    /// Open the module with parameters read from wired parameter terminals
    ///
    /// Every round takes one item from each parameter terminal and opens the
    /// module with those values, until a terminal runs dry. A module fed on
    /// its item input runs a single round over the whole input.
    pub fn open_bound(
        &self,
        id: &str,
        params: Vec<(String, ItemStream)>,
        inputs: Inputs,
        env: &RunEnv,
    ) -> ItemStream {
        if params.is_empty() {
            return self.open(id, inputs, env);
        }

        let module = self.clone();
        let id = id.to_string();
        let env = env.clone();
        let mut params = params;

        if inputs.is_wired() {
            return stream::deferred(move || match next_values(&mut params) {
                Some(Ok(values)) => module.bind_terminals(&values).open(&id, inputs, &env),
                Some(Err(e)) => stream::failed(e),
                None => stream::failed(PipeError::module_config(
                    &id,
                    "parameter terminals received no items",
                )),
            });
        }

        Box::new(
            std::iter::from_fn(move || next_values(&mut params)).flat_map(move |round| match round {
                Ok(values) => module.bind_terminals(&values).open(&id, Inputs::none(), &env),
                Err(e) => stream::failed(e),
            }),
        )
    }

    /// Copy of the module with terminal parameters replaced by `values`
    pub fn bind_terminals(&self, values: &HashMap<String, Value>) -> Module {
        match self {
            Module::Fetch(spec) => Module::Fetch(spec.bind(values)),
            Module::FetchData(spec) => Module::FetchData(spec.bind(values)),
            Module::Filter(spec) => Module::Filter(spec.bind(values)),
            Module::ItemBuilder(spec) => Module::ItemBuilder(spec.bind(values)),
            Module::RssItemBuilder(spec) => Module::RssItemBuilder(spec.bind(values)),
            Module::UrlBuilder(spec) => Module::UrlBuilder(spec.bind(values)),
            Module::Yql(spec) => Module::Yql(spec.bind(values)),
            Module::SubPipe(spec) => Module::SubPipe(spec.bind(values)),
            other => other.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Module::Fetch(_) => "fetch",
            Module::FetchData(_) => "fetchdata",
            Module::Input => "input",
            Module::TextInput(_) => "textinput",
            Module::Output => "output",
            Module::Filter(_) => "filter",
            Module::Sort(_) => "sort",
            Module::Truncate(_) => "truncate",
            Module::Tail(_) => "tail",
            Module::Reverse => "reverse",
            Module::Count => "count",
            Module::Union => "union",
            Module::Uniq(_) => "uniq",
            Module::Rename(_) => "rename",
            Module::ItemBuilder(_) => "itembuilder",
            Module::RssItemBuilder(_) => "rssitembuilder",
            Module::UrlBuilder(_) => "urlbuilder",
            Module::Regex(_) => "regex",
            Module::Yql(_) => "yql",
            Module::Loop(_) => "loop",
            Module::SubPipe(_) => "pipe",
        }
    }

    /// Whether the module drains its whole input before yielding
    pub fn is_buffering(&self) -> bool {
        matches!(
            self,
            Module::Sort(_) | Module::Tail(_) | Module::Reverse | Module::Count
        )
    }
}

/// Input streams bound to a module, in wire declaration order
pub struct Inputs {
    streams: Vec<(String, ItemStream)>,
}

impl Inputs {
    pub fn new(streams: Vec<(String, ItemStream)>) -> Self {
        Self { streams }
    }

    pub fn none() -> Self {
        Self {
            streams: Vec::new(),
        }
    }

    pub fn is_wired(&self) -> bool {
        !self.streams.is_empty()
    }

    pub fn terminals(&self) -> Vec<&str> {
        self.streams.iter().map(|(terminal, _)| terminal.as_str()).collect()
    }

    /// Separate the streams wired into parameter terminals from the item input
    ///
    /// Several wires into one parameter terminal are read in declaration order.
    pub fn split_params(self, names: &[String]) -> (Vec<(String, ItemStream)>, Inputs) {
        let mut grouped: Vec<(String, Vec<ItemStream>)> = Vec::new();
        let mut data = Vec::new();
        for (terminal, s) in self.streams {
            if !names.contains(&terminal) {
                data.push((terminal, s));
                continue;
            }
            match grouped.iter_mut().find(|(name, _)| *name == terminal) {
                Some((_, streams)) => streams.push(s),
                None => grouped.push((terminal, vec![s])),
            }
        }

        let params = grouped
            .into_iter()
            .map(|(name, streams)| (name, stream::concat(streams)))
            .collect();
        (params, Inputs::new(data))
    }

    /// Every bound stream concatenated in declaration order
    pub fn take_all(self) -> ItemStream {
        stream::concat(self.streams.into_iter().map(|(_, s)| s).collect())
    }
}

impl fmt::Debug for Inputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inputs")
            .field("terminals", &self.terminals())
            .finish()
    }
}

/// One value per parameter terminal, or `None` once any terminal is exhausted
fn next_values(params: &mut [(String, ItemStream)]) -> Option<PipeResult<HashMap<String, Value>>> {
    let mut values = HashMap::with_capacity(params.len());
    for (name, s) in params.iter_mut() {
        match s.next()? {
            Ok(item) => {
                values.insert(name.clone(), terminal_value(item));
            }
            Err(e) => return Some(Err(e)),
        }
    }
    Some(Ok(values))
}

/// The parameter value carried by an item on a parameter terminal
///
/// Single-field items such as `{"url": ...}` carry that field's value.
fn terminal_value(item: Item) -> Value {
    let map = item.into_map();
    if map.len() == 1 {
        map.into_iter().next().map(|(_, value)| value).unwrap_or(Value::Null)
    } else {
        Value::Object(map)
    }
}

/// Run `f` on every input item, or once on the scope item when unwired
pub(crate) fn per_item<F>(inputs: Inputs, env: &RunEnv, f: F) -> ItemStream
where
    F: FnMut(Item) -> ItemStream + 'static,
{
    if inputs.is_wired() {
        stream::flat_map_items(inputs.take_all(), f)
    } else {
        let scope = env.scope.clone();
        let mut f = f;
        stream::deferred(move || f(scope))
    }
}

/// Typed access to one module's parameters
///
/// Every failure is reported as a config error of the owning module.
#[derive(Debug, Clone, Copy)]
pub struct ConfigReader<'a> {
    module: &'a str,
    config: &'a ModuleConfig,
}

impl<'a> ConfigReader<'a> {
    pub fn new(module: &'a str, config: &'a ModuleConfig) -> Self {
        Self { module, config }
    }

    pub fn module(&self) -> &'a str {
        self.module
    }

    pub fn error(&self, message: impl Into<String>) -> PipeError {
        PipeError::module_config(self.module, message)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'a String, &'a ParamValue)> + 'a {
        self.config.iter()
    }

    pub fn param(&self, name: &str) -> Option<&'a ParamValue> {
        self.config.get(name)
    }

    pub fn required(&self, name: &str) -> PipeResult<&'a ParamValue> {
        self.param(name)
            .ok_or_else(|| self.error(format!("missing parameter '{}'", name)))
    }

    /// A literal scalar parameter rendered as text
    pub fn literal_str(&self, name: &str) -> PipeResult<Option<String>> {
        match self.param(name) {
            None | Some(ParamValue::Literal(Value::Null)) => Ok(None),
            Some(ParamValue::Literal(value @ (Value::Array(_) | Value::Object(_)))) => Err(
                self.error(format!("parameter '{}' must be a scalar, got {}", name, value)),
            ),
            Some(ParamValue::Literal(value)) => Ok(Some(crate::core::item::value_to_text(value))),
            Some(_) => Err(self.error(format!("parameter '{}' must be a literal", name))),
        }
    }

    /// A literal non-negative integer, given as a number or a numeric string
    pub fn literal_usize(&self, name: &str) -> PipeResult<Option<usize>> {
        let Some(text) = self.literal_str(name)? else {
            return Ok(None);
        };
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<usize>()
            .map(Some)
            .map_err(|_| self.error(format!("parameter '{}' must be a non-negative integer, got '{}'", name, text)))
    }

    pub fn required_count(&self, name: &str) -> PipeResult<usize> {
        self.literal_usize(name)?
            .ok_or_else(|| self.error(format!("missing parameter '{}'", name)))
    }

    /// A field path given as a literal string (or an item path)
    pub fn path(&self, name: &str) -> PipeResult<Option<FieldPath>> {
        match self.param(name) {
            Some(ParamValue::ItemPath(path)) => Ok(Some(path.clone())),
            _ => match self.literal_str(name)? {
                Some(text) if !text.trim().is_empty() => FieldPath::parse(&text)
                    .map(Some)
                    .map_err(|e| self.error(format!("parameter '{}': {}", name, e))),
                _ => Ok(None),
            },
        }
    }

    pub fn required_path(&self, name: &str) -> PipeResult<FieldPath> {
        self.path(name)?
            .ok_or_else(|| self.error(format!("missing parameter '{}'", name)))
    }

    /// Nested sub-configurations (rules, keys, attributes)
    pub fn nested(&self, name: &str) -> PipeResult<Vec<ConfigReader<'a>>> {
        match self.param(name) {
            None | Some(ParamValue::Literal(Value::Null)) => Ok(Vec::new()),
            Some(ParamValue::Literal(Value::Array(list))) if list.is_empty() => Ok(Vec::new()),
            Some(ParamValue::Nested(configs)) => Ok(configs
                .iter()
                .map(|config| ConfigReader::new(self.module, config))
                .collect()),
            Some(_) => Err(self.error(format!("parameter '{}' must be a list of entries", name))),
        }
    }

    /// A parameter holding one value or a list of values
    pub fn list_values(&self, name: &str) -> PipeResult<Vec<ParamValue>> {
        match self.param(name) {
            None | Some(ParamValue::Literal(Value::Null)) => Ok(Vec::new()),
            Some(ParamValue::Literal(Value::Array(list))) => list
                .iter()
                .map(|raw| ParamValue::decode(raw).map_err(|e| self.error(e)))
                .collect(),
            Some(ParamValue::Nested(configs)) => configs
                .iter()
                .map(|config| {
                    element_param(config).ok_or_else(|| {
                        self.error(format!("parameter '{}' has an entry without a value", name))
                    })
                })
                .collect(),
            Some(param) => Ok(vec![param.clone()]),
        }
    }
}

/// The value carried by one wrapped list element such as `{"type": "text", "value": "x"}`
fn element_param(config: &ModuleConfig) -> Option<ParamValue> {
    if let Some(ParamValue::Literal(Value::String(path))) = config.get("subkey") {
        return FieldPath::parse(path).ok().map(ParamValue::ItemPath);
    }
    if let Some(ParamValue::Literal(Value::String(text))) = config.get("template") {
        return crate::core::Template::parse(text).ok().map(ParamValue::Templated);
    }
    config.get("value").cloned()
}

/// A compiled regular expression, compared by its source text
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile `source` with flag letters `i`, `m` and `s`
    pub fn compile(module: &str, source: &str, flags: &str) -> PipeResult<Self> {
        RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map(Pattern)
            .map_err(|e| PipeError::module_config(module, format!("invalid pattern '{}': {}", source, e)))
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}
