//! Filter module - permit or block items by a predicate tree

use crate::core::item::value_to_text;
use crate::core::{FieldPath, Item, ParamValue, PipeResult};
use crate::execution::stream::ItemStream;
use crate::modules::{ConfigReader, Pattern};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// Emit matching items (permit) or non-matching ones (block)
    pub permit: bool,
    pub rules: RuleGroup,
}

/// Rules joined by `and` (all) or `or` (any)
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    pub any: bool,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Test { field: FieldPath, test: Test },
    Group(RuleGroup),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    Compare { op: Op, operand: ParamValue },
    Matches(Pattern),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Contains,
    DoesNotContain,
    Is,
    IsNot,
    Greater,
    Less,
    After,
    Before,
}

impl Op {
    fn parse(name: &str) -> Option<Self> {
        let op = match name.to_ascii_lowercase().as_str() {
            "contains" => Op::Contains,
            "doesnotcontain" => Op::DoesNotContain,
            "is" => Op::Is,
            "isnot" => Op::IsNot,
            "greater" => Op::Greater,
            "less" => Op::Less,
            "after" => Op::After,
            "before" => Op::Before,
            _ => return None,
        };
        Some(op)
    }
}

impl FilterSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        let permit = match config.literal_str("MODE")?.as_deref().map(str::to_ascii_lowercase) {
            None => true,
            Some(mode) if mode == "permit" => true,
            Some(mode) if mode == "block" => false,
            Some(mode) => return Err(config.error(format!("unknown filter mode '{}'", mode))),
        };

        Ok(Self {
            permit,
            rules: compile_group(config)?,
        })
    }

    pub fn bind(&self, values: &HashMap<String, Value>) -> Self {
        Self {
            permit: self.permit,
            rules: self.rules.bind(values),
        }
    }

    pub fn open(&self, input: ItemStream) -> ItemStream {
        let spec = self.clone();
        Box::new(input.filter(move |result| match result {
            Ok(item) => spec.rules.evaluate(item) == spec.permit,
            Err(_) => true,
        }))
    }
}

fn compile_group(config: &ConfigReader) -> PipeResult<RuleGroup> {
    let any = match config.literal_str("COMBINE")?.as_deref().map(str::to_ascii_lowercase) {
        None => false,
        Some(combine) if combine == "and" => false,
        Some(combine) if combine == "or" => true,
        Some(combine) => return Err(config.error(format!("unknown combine '{}'", combine))),
    };

    let rules = config
        .nested("RULE")?
        .iter()
        .map(compile_rule)
        .collect::<PipeResult<Vec<_>>>()?;

    Ok(RuleGroup { any, rules })
}

fn compile_rule(rule: &ConfigReader) -> PipeResult<Rule> {
    if rule.param("RULE").is_some() {
        return compile_group(rule).map(Rule::Group);
    }

    let field = rule.required_path("field")?;
    let op_name = rule
        .literal_str("op")?
        .ok_or_else(|| rule.error(format!("rule on '{}' has no op", field)))?;

    let test = if op_name.eq_ignore_ascii_case("matches") {
        let source = rule
            .literal_str("value")?
            .ok_or_else(|| rule.error(format!("rule on '{}' has no pattern", field)))?;
        Test::Matches(Pattern::compile(rule.module(), &source, "")?)
    } else {
        let op = Op::parse(&op_name)
            .ok_or_else(|| rule.error(format!("unknown filter op '{}'", op_name)))?;
        let operand = rule
            .param("value")
            .cloned()
            .unwrap_or_else(|| ParamValue::literal(""));
        Test::Compare { op, operand }
    };

    Ok(Rule::Test { field, test })
}

impl RuleGroup {
    pub fn bind(&self, values: &HashMap<String, Value>) -> Self {
        let rules = self
            .rules
            .iter()
            .map(|rule| match rule {
                Rule::Test {
                    field,
                    test: Test::Compare { op, operand },
                } => Rule::Test {
                    field: field.clone(),
                    test: Test::Compare {
                        op: *op,
                        operand: operand.bind(values),
                    },
                },
                Rule::Group(group) => Rule::Group(group.bind(values)),
                other => other.clone(),
            })
            .collect();
        Self { any: self.any, rules }
    }

    pub fn evaluate(&self, item: &Item) -> bool {
        if self.any {
            self.rules.iter().any(|rule| rule.evaluate(item))
        } else {
            self.rules.iter().all(|rule| rule.evaluate(item))
        }
    }
}

impl Rule {
    /// A rule whose field or operand is absent is false
    pub fn evaluate(&self, item: &Item) -> bool {
        match self {
            Rule::Group(group) => group.evaluate(item),
            Rule::Test { field, test } => {
                let Ok(value) = item.lookup(field) else {
                    return false;
                };
                let text = value_to_text(value);
                match test {
                    Test::Matches(pattern) => pattern.is_match(&text),
                    Test::Compare { op, operand } => match operand.resolve_text(item) {
                        Ok(operand) => compare(*op, &text, &operand),
                        Err(_) => false,
                    },
                }
            }
        }
    }
}

fn compare(op: Op, text: &str, operand: &str) -> bool {
    match op {
        Op::Contains => text.to_lowercase().contains(&operand.to_lowercase()),
        Op::DoesNotContain => !text.to_lowercase().contains(&operand.to_lowercase()),
        Op::Is => order(text, operand) == Some(Ordering::Equal),
        Op::IsNot => order(text, operand) != Some(Ordering::Equal),
        Op::Greater => order(text, operand) == Some(Ordering::Greater),
        Op::Less => order(text, operand) == Some(Ordering::Less),
        Op::After => match (parse_date(text), parse_date(operand)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        Op::Before => match (parse_date(text), parse_date(operand)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
    }
}

/// Numeric when both sides are numbers, lexicographic otherwise
fn order(left: &str, right: &str) -> Option<Ordering> {
    match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(left.cmp(right)),
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
