//! Rename module - move or copy fields within each item

use crate::core::{FieldPath, PipeResult};
use crate::execution::stream::{self, ItemStream};
use crate::modules::ConfigReader;

#[derive(Debug, Clone, PartialEq)]
pub struct RenameSpec {
    pub rules: Vec<RenameRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameRule {
    pub copy: bool,
    pub field: FieldPath,
    pub target: FieldPath,
}

impl RenameSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        let rules = config
            .nested("RULE")?
            .iter()
            .map(|rule| -> PipeResult<RenameRule> {
                let copy = match rule.literal_str("op")?.as_deref().map(str::to_ascii_lowercase) {
                    None => false,
                    Some(op) if op == "rename" => false,
                    Some(op) if op == "copy" => true,
                    Some(op) => return Err(rule.error(format!("unknown rename op '{}'", op))),
                };
                Ok(RenameRule {
                    copy,
                    field: rule.required_path("field")?,
                    target: rule.required_path("newval")?,
                })
            })
            .collect::<PipeResult<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn open(&self, input: ItemStream) -> ItemStream {
        let rules = self.rules.clone();
        stream::map_items(input, move |mut item| {
            for rule in &rules {
                let value = if rule.copy {
                    item.lookup(&rule.field).ok().cloned()
                } else {
                    item.remove_path(&rule.field)
                };
                if let Some(value) = value {
                    item.replace_path(&rule.target, value);
                }
            }
            Ok(item)
        })
    }
}
