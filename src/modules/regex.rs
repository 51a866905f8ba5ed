//! Regex module - ordered find/replace rules over item fields

use crate::core::{FieldPath, PipeResult};
use crate::execution::stream::{self, ItemStream};
use crate::modules::{ConfigReader, Pattern};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct RegexSpec {
    pub rules: Vec<RegexRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegexRule {
    pub field: FieldPath,
    pub pattern: Pattern,
    /// Replacement with `$1` / `${name}` group references
    pub replace: String,
    pub global: bool,
}

impl RegexSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        let rules = config
            .nested("RULE")?
            .iter()
            .map(|rule| -> PipeResult<RegexRule> {
                let field = rule.required_path("field")?;
                let source = rule
                    .literal_str("match")?
                    .ok_or_else(|| rule.error(format!("rule on '{}' has no match pattern", field)))?;
                let flags = rule.literal_str("flags")?.unwrap_or_default();
                Ok(RegexRule {
                    pattern: Pattern::compile(rule.module(), &source, &flags)?,
                    replace: rule.literal_str("replace")?.unwrap_or_default(),
                    global: flags.contains('g'),
                    field,
                })
            })
            .collect::<PipeResult<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn open(&self, input: ItemStream) -> ItemStream {
        let rules = self.rules.clone();
        stream::map_items(input, move |mut item| {
            for rule in &rules {
                let Ok(Value::String(text)) = item.lookup(&rule.field) else {
                    continue;
                };
                let regex = rule.pattern.regex();
                let replaced = if rule.global {
                    regex.replace_all(text, rule.replace.as_str())
                } else {
                    regex.replace(text, rule.replace.as_str())
                };
                let replaced = replaced.into_owned();
                item.set_path(&rule.field, Value::String(replaced));
            }
            Ok(item)
        })
    }
}
