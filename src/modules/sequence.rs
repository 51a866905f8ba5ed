//! Order and size operators: truncate, tail, reverse, count, uniq

use crate::core::item::value_to_text;
use crate::core::{FieldPath, Item, PipeResult};
use crate::execution::stream::{self, ItemStream};
use serde_json::json;
use std::collections::HashSet;

/// Keep at most `count` leading items
///
/// Upstream is not pulled again once the limit is reached. Errors pass through
/// without counting toward the limit.
pub fn truncate(input: ItemStream, count: usize) -> ItemStream {
    Box::new(Truncate {
        input,
        remaining: count,
    })
}

struct Truncate {
    input: ItemStream,
    remaining: usize,
}

impl Iterator for Truncate {
    type Item = PipeResult<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let result = self.input.next()?;
        if result.is_ok() {
            self.remaining -= 1;
        }
        Some(result)
    }
}

/// Keep the last `count` items
pub fn tail(input: ItemStream, count: usize) -> ItemStream {
    stream::buffered(input, move |mut items| {
        let skip = items.len().saturating_sub(count);
        items.drain(..skip);
        items
    })
}

pub fn reverse(input: ItemStream) -> ItemStream {
    stream::buffered(input, |mut items| {
        items.reverse();
        items
    })
}

/// Emit a single `{"count": n}` item
pub fn count(input: ItemStream) -> ItemStream {
    stream::buffered(input, |items| vec![Item::wrap(json!({ "count": items.len() }))])
}

/// Drop items whose `field` value was already seen
///
/// Items without the field always pass.
pub fn uniq(input: ItemStream, field: FieldPath) -> ItemStream {
    let mut seen = HashSet::new();
    Box::new(input.filter(move |result| match result {
        Ok(item) => match item.lookup(&field) {
            Ok(value) => seen.insert(value_to_text(value)),
            Err(_) => true,
        },
        Err(_) => true,
    }))
}
