//! Module parameters and their per-item resolution

use crate::core::item::{value_to_text, FieldPath, Item, PathNotFound};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// A configured parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Static value
    Literal(Value),
    /// Value taken from the current item
    ItemPath(FieldPath),
    /// String with `{{ path }}` references into the current item
    Templated(Template),
    /// Ordered list of sub-configurations (filter rules, builder attributes, ...)
    Nested(Vec<ModuleConfig>),
    /// Value read from the items wired into the named parameter terminal
    Terminal(String),
}

impl ParamValue {
    /// Decode a parameter from its definition form
    ///
    /// `{"value": v}` and bare scalars are literals, `{"subkey": "a.b"}` is an
    /// item path, `{"template": "..."}` is a template, `{"terminal": "URL"}`
    /// binds the parameter to a wired terminal, lists of maps and plain maps
    /// are nested configurations.
    pub fn decode(raw: &Value) -> Result<Self, String> {
        match raw {
            Value::Object(map) => {
                if let Some(subkey) = map.get("subkey") {
                    let text = subkey
                        .as_str()
                        .ok_or_else(|| "'subkey' must be a string".to_string())?;
                    return Ok(ParamValue::ItemPath(FieldPath::parse(text)?));
                }
                if let Some(template) = map.get("template") {
                    let text = template
                        .as_str()
                        .ok_or_else(|| "'template' must be a string".to_string())?;
                    return Ok(ParamValue::Templated(Template::parse(text)?));
                }
                if let Some(terminal) = map.get("terminal") {
                    let name = terminal
                        .as_str()
                        .filter(|name| !name.is_empty())
                        .ok_or_else(|| "'terminal' must be a non-empty string".to_string())?;
                    return Ok(ParamValue::Terminal(name.to_string()));
                }
                if let Some(value) = map.get("value") {
                    if map.keys().all(|key| key == "value" || key == "type") {
                        return Ok(ParamValue::Literal(value.clone()));
                    }
                }
                Ok(ParamValue::Nested(vec![ModuleConfig::decode(map)?]))
            }
            Value::Array(list) if !list.is_empty() && list.iter().all(Value::is_object) => {
                let configs = list
                    .iter()
                    .filter_map(Value::as_object)
                    .map(ModuleConfig::decode)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ParamValue::Nested(configs))
            }
            other => Ok(ParamValue::Literal(other.clone())),
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        ParamValue::Literal(value.into())
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, ParamValue::Literal(_))
    }

    /// Replace terminal references with the values read from their terminals
    pub fn bind(&self, values: &HashMap<String, Value>) -> ParamValue {
        match self {
            ParamValue::Terminal(name) => match values.get(name) {
                Some(value) => ParamValue::Literal(value.clone()),
                None => self.clone(),
            },
            ParamValue::Nested(configs) => {
                ParamValue::Nested(configs.iter().map(|config| config.bind(values)).collect())
            }
            other => other.clone(),
        }
    }

    fn collect_terminals(&self, names: &mut Vec<String>) {
        match self {
            ParamValue::Terminal(name) => names.push(name.clone()),
            ParamValue::Nested(configs) => {
                for config in configs {
                    for param in config.params.values() {
                        param.collect_terminals(names);
                    }
                }
            }
            _ => {}
        }
    }

    /// Resolve against the current item
    ///
    /// A terminal reference that was never bound resolves as a missing path.
    pub fn resolve(&self, item: &Item) -> Result<Value, PathNotFound> {
        match self {
            ParamValue::Literal(value) => Ok(value.clone()),
            ParamValue::Terminal(name) => Err(PathNotFound {
                path: format!("terminal {}", name),
            }),
            ParamValue::ItemPath(path) => item.lookup(path).cloned(),
            ParamValue::Templated(template) => template.render(item).map(Value::String),
            ParamValue::Nested(configs) => configs
                .iter()
                .map(|config| config.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Resolve and render as plain text
    pub fn resolve_text(&self, item: &Item) -> Result<String, PathNotFound> {
        self.resolve(item).map(|value| value_to_text(&value))
    }
}

/// Parameter map of one module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleConfig {
    params: BTreeMap<String, ParamValue>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(raw: &Map<String, Value>) -> Result<Self, String> {
        let mut params = BTreeMap::new();
        for (name, value) in raw {
            let param = ParamValue::decode(value).map_err(|e| format!("parameter '{}': {}", name, e))?;
            params.insert(name.clone(), param);
        }
        Ok(Self { params })
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Look up a parameter, falling back to a case-insensitive match
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name).or_else(|| {
            self.params
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.params.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Names of the parameter terminals referenced anywhere in this config
    pub fn terminals(&self) -> Vec<String> {
        let mut names = Vec::new();
        for param in self.params.values() {
            param.collect_terminals(&mut names);
        }
        names.sort();
        names.dedup();
        names
    }

    pub fn bind(&self, values: &HashMap<String, Value>) -> ModuleConfig {
        ModuleConfig {
            params: self
                .params
                .iter()
                .map(|(name, param)| (name.clone(), param.bind(values)))
                .collect(),
        }
    }

    fn resolve(&self, item: &Item) -> Result<Value, PathNotFound> {
        let mut map = Map::new();
        for (name, param) in &self.params {
            map.insert(name.clone(), param.resolve(item)?);
        }
        Ok(Value::Object(map))
    }
}

/// A string with embedded item path references: `"by {{ author.name }}"`
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

#[derive(Debug, Clone, PartialEq)]
enum TemplatePart {
    Text(String),
    Field(FieldPath),
}

impl Template {
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut parts = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                parts.push(TemplatePart::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| format!("unterminated placeholder in template '{}'", text))?;
            parts.push(TemplatePart::Field(FieldPath::parse(&after[..end])?));
            rest = &after[end + 2..];
        }

        if !rest.is_empty() {
            parts.push(TemplatePart::Text(rest.to_string()));
        }

        Ok(Self { parts })
    }

    pub fn render(&self, item: &Item) -> Result<String, PathNotFound> {
        let mut rendered = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Text(text) => rendered.push_str(text),
                TemplatePart::Field(path) => rendered.push_str(&value_to_text(item.lookup(path)?)),
            }
        }
        Ok(rendered)
    }
}
