//! Items flowing through a pipe and the field paths that address them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A field path could not be resolved against an item
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{path}' not found in item")]
pub struct PathNotFound {
    pub path: String,
}

/// Path of keys into a nested item, e.g. `media:thumbnail.url`
///
/// The text form is dot separated. A leading `item.` is accepted and dropped,
/// and numeric segments index into lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path
    pub fn parse(text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        let trimmed = trimmed.strip_prefix("item.").unwrap_or(trimmed);

        if trimmed.is_empty() || trimmed == "item" {
            return Err(format!("invalid field path '{}'", text));
        }

        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(format!("invalid field path '{}': empty segment", text));
        }

        Ok(Self { segments })
    }

    /// Build a path from a single key (the key may contain dots)
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            segments: vec![key.into()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// One structured record flowing through a pipe
///
/// Keys keep their insertion order for display; equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Convert a value to an item; maps are taken as-is, anything else is
    /// wrapped as `{"content": value}`
    pub fn wrap(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                let mut item = Self::new();
                item.insert("content", other);
                item
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Resolve a path against this item
    pub fn lookup(&self, path: &FieldPath) -> Result<&Value, PathNotFound> {
        let missing = || PathNotFound {
            path: path.to_string(),
        };

        let (first, rest) = path.segments.split_first().ok_or_else(missing)?;
        let mut current = self.0.get(first).ok_or_else(missing)?;

        for segment in rest {
            current = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(list) => segment.parse::<usize>().ok().and_then(|i| list.get(i)),
                _ => None,
            }
            .ok_or_else(missing)?;
        }

        Ok(current)
    }

    /// Assign a value at a path, creating intermediate maps as needed
    ///
    /// When both the existing and the new value are maps they are deep-merged,
    /// so assignments sharing a prefix augment each other. Any other existing
    /// value at the exact path is replaced.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) {
        if let Some(slot) = self.slot_mut(path) {
            merge_value(slot, value);
        }
    }

    /// Assign a value at a path, replacing whatever was there
    pub fn replace_path(&mut self, path: &FieldPath, value: Value) {
        if let Some(slot) = self.slot_mut(path) {
            *slot = value;
        }
    }

    /// The slot at `path`, created on the way down
    ///
    /// Numeric segments index into lists like [`Item::lookup`]; an index one
    /// past the end appends. Scalars on the way are replaced by maps. Returns
    /// `None` when the path runs into a list with no such index.
    fn slot_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let (first, rest) = path.segments.split_first()?;
        let mut slot = self.0.entry(first.clone()).or_insert(Value::Null);

        for segment in rest {
            let index = match &*slot {
                Value::Array(list) => Some(segment.parse::<usize>().ok().filter(|i| *i <= list.len())?),
                _ => None,
            };
            slot = match (index, slot) {
                (Some(i), Value::Array(list)) => {
                    if i == list.len() {
                        list.push(Value::Null);
                    }
                    &mut list[i]
                }
                (_, other) => {
                    if !other.is_object() {
                        *other = Value::Object(Map::new());
                    }
                    other
                        .as_object_mut()?
                        .entry(segment.clone())
                        .or_insert(Value::Null)
                }
            };
        }

        Some(slot)
    }

    /// Remove the value at a path, returning it
    pub fn remove_path(&mut self, path: &FieldPath) -> Option<Value> {
        let (last, parents) = path.segments.split_last()?;

        let mut map = &mut self.0;
        for segment in parents {
            map = map.get_mut(segment)?.as_object_mut()?;
        }

        map.remove(last)
    }
}

impl From<Map<String, Value>> for Item {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        Value::Object(item.0)
    }
}

impl TryFrom<Value> for Item {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

fn merge_value(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}

/// Render a value as plain text
///
/// Maps carrying a string `content` key render as that content.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => match map.get("content") {
            Some(Value::String(content)) => content.clone(),
            _ => value.to_string(),
        },
        Value::Array(_) => value.to_string(),
    }
}
