//! Sort module

use crate::core::item::value_to_text;
use crate::core::{FieldPath, Item, PipeResult};
use crate::execution::stream::{self, ItemStream};
use crate::modules::ConfigReader;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: FieldPath,
    pub descending: bool,
}

impl SortSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        let keys = config
            .nested("KEY")?
            .iter()
            .map(|key| -> PipeResult<SortKey> {
                let field = key.required_path("field")?;
                let descending = match key.literal_str("dir")?.as_deref().map(str::to_ascii_uppercase) {
                    None => false,
                    Some(dir) if dir == "ASC" => false,
                    Some(dir) if dir == "DESC" => true,
                    Some(dir) => return Err(key.error(format!("unknown sort direction '{}'", dir))),
                };
                Ok(SortKey { field, descending })
            })
            .collect::<PipeResult<Vec<_>>>()?;

        if keys.is_empty() {
            return Err(config.error("sort needs at least one KEY"));
        }

        Ok(Self { keys })
    }

    pub fn open(&self, input: ItemStream) -> ItemStream {
        let keys = self.keys.clone();
        stream::buffered(input, move |mut items| {
            items.sort_by(|a, b| compare_items(&keys, a, b));
            items
        })
    }
}

fn compare_items(keys: &[SortKey], a: &Item, b: &Item) -> Ordering {
    for key in keys {
        let left = SortValue::of(a, &key.field);
        let right = SortValue::of(b, &key.field);
        let ordering = left.cmp(&right);
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Comparable form of a field value: missing < numbers < text
#[derive(Debug, PartialEq)]
enum SortValue {
    Missing,
    Number(f64),
    Text(String),
}

impl SortValue {
    fn of(item: &Item, field: &FieldPath) -> Self {
        match item.lookup(field) {
            Err(_) | Ok(Value::Null) => SortValue::Missing,
            Ok(Value::Number(n)) => n.as_f64().map_or(SortValue::Missing, SortValue::Number),
            Ok(value) => {
                let text = value_to_text(value);
                match text.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => SortValue::Number(n),
                    _ => SortValue::Text(text),
                }
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortValue::Missing => 0,
            SortValue::Number(_) => 1,
            SortValue::Text(_) => 2,
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}
