//! Item builders - assemble items from ordered path assignments

use crate::core::{FieldPath, Item, ParamValue, PipeResult};
use crate::execution::assembler::RunEnv;
use crate::execution::stream::{self, ItemStream};
use crate::modules::{per_item, ConfigReader, Inputs};
use serde_json::Value;
use std::collections::HashMap;

/// RSS builder parameters and the item paths they fill
const RSS_FIELDS: &[(&str, &[&str])] = &[
    ("title", &["title", "y:title"]),
    ("link", &["link"]),
    ("description", &["description"]),
    ("author", &["author"]),
    ("guid", &["guid"]),
    ("pubdate", &["pubDate"]),
    ("category", &["category"]),
    ("mediaThumbURL", &["media:thumbnail.url"]),
    ("mediaThumbWidth", &["media:thumbnail.width"]),
    ("mediaThumbHeight", &["media:thumbnail.height"]),
    ("mediaContentURL", &["media:content.url"]),
    ("mediaContentType", &["media:content.type"]),
    ("mediaContentWidth", &["media:content.width"]),
    ("mediaContentHeight", &["media:content.height"]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderSpec {
    pub assignments: Vec<(FieldPath, ParamValue)>,
    /// Start from a copy of the input item instead of an empty one
    pub overlay: bool,
}

impl BuilderSpec {
    /// `itembuilder`: a fresh item per input from the `attrs` list
    pub fn item_builder(config: &ConfigReader) -> PipeResult<Self> {
        let assignments = config
            .nested("attrs")?
            .iter()
            .map(|attr| -> PipeResult<(FieldPath, ParamValue)> {
                Ok((attr.required_path("key")?, attr.required("value")?.clone()))
            })
            .collect::<PipeResult<Vec<_>>>()?;

        Ok(Self {
            assignments,
            overlay: false,
        })
    }

    /// `rssitembuilder`: canonical RSS fields laid over the input item
    pub fn rss_item_builder(config: &ConfigReader) -> PipeResult<Self> {
        let mut assignments = Vec::new();
        for (name, targets) in RSS_FIELDS {
            let Some(param) = config.param(name) else {
                continue;
            };
            if is_blank(param) {
                continue;
            }
            for target in *targets {
                let path = FieldPath::parse(target).map_err(|e| config.error(e))?;
                assignments.push((path, param.clone()));
            }
        }

        Ok(Self {
            assignments,
            overlay: true,
        })
    }

    pub fn bind(&self, values: &HashMap<String, Value>) -> Self {
        Self {
            assignments: self
                .assignments
                .iter()
                .map(|(path, param)| (path.clone(), param.bind(values)))
                .collect(),
            overlay: self.overlay,
        }
    }

    pub fn open(&self, inputs: Inputs, env: &RunEnv) -> ItemStream {
        let spec = self.clone();
        let wired = inputs.is_wired();
        per_item(inputs, env, move |source| {
            let base = if spec.overlay && wired {
                source.clone()
            } else {
                Item::new()
            };
            stream::once(spec.build(base, &source))
        })
    }

    /// Apply every assignment to `base`, resolving values against `source`
    pub fn build(&self, mut base: Item, source: &Item) -> PipeResult<Item> {
        for (path, param) in &self.assignments {
            let value = param.resolve(source)?;
            base.set_path(path, value);
        }
        Ok(base)
    }
}

fn is_blank(param: &ParamValue) -> bool {
    match param {
        ParamValue::Literal(Value::Null) => true,
        ParamValue::Literal(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}
