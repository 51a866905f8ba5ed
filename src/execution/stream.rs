//! Lazy item sequences and the combinators the runtime builds them from

use crate::core::{Item, PipeError, PipeResult};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Pull-based sequence of items; errors are yielded at the position they occur
pub type ItemStream = Box<dyn Iterator<Item = PipeResult<Item>>>;

pub fn empty() -> ItemStream {
    Box::new(std::iter::empty())
}

pub fn once(item: PipeResult<Item>) -> ItemStream {
    Box::new(std::iter::once(item))
}

pub fn failed(error: PipeError) -> ItemStream {
    once(Err(error))
}

pub fn from_items(items: Vec<Item>) -> ItemStream {
    Box::new(items.into_iter().map(Ok))
}

/// Concatenate streams in order, pulling each only after the previous ends
pub fn concat(streams: Vec<ItemStream>) -> ItemStream {
    match streams.len() {
        0 => empty(),
        1 => streams.into_iter().next().unwrap_or_else(empty),
        _ => Box::new(streams.into_iter().flatten()),
    }
}

/// Stream whose construction is postponed until the first pull
pub fn deferred<F>(open: F) -> ItemStream
where
    F: FnOnce() -> ItemStream + 'static,
{
    Box::new(Deferred {
        open: Some(open),
        stream: None,
    })
}

struct Deferred<F> {
    open: Option<F>,
    stream: Option<ItemStream>,
}

impl<F> Iterator for Deferred<F>
where
    F: FnOnce() -> ItemStream,
{
    type Item = PipeResult<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(open) = self.open.take() {
            self.stream = Some(open());
        }
        self.stream.as_mut()?.next()
    }
}

/// Map every item through a fallible function; upstream errors pass through
pub fn map_items<F>(input: ItemStream, mut f: F) -> ItemStream
where
    F: FnMut(Item) -> PipeResult<Item> + 'static,
{
    Box::new(input.map(move |result| result.and_then(&mut f)))
}

/// Expand every item into a stream; upstream errors pass through
pub fn flat_map_items<F>(input: ItemStream, mut f: F) -> ItemStream
where
    F: FnMut(Item) -> ItemStream + 'static,
{
    Box::new(input.flat_map(move |result| match result {
        Ok(item) => f(item),
        Err(e) => failed(e),
    }))
}

/// Drain the input on first pull, then yield `finish(items)`
///
/// Upstream errors are yielded ahead of the buffered output.
pub fn buffered<F>(input: ItemStream, finish: F) -> ItemStream
where
    F: FnOnce(Vec<Item>) -> Vec<Item> + 'static,
{
    deferred(move || {
        let mut items = Vec::new();
        let mut errors = Vec::new();
        for result in input {
            match result {
                Ok(item) => items.push(item),
                Err(e) => errors.push(Err(e)),
            }
        }
        Box::new(errors.into_iter().chain(finish(items).into_iter().map(Ok)))
    })
}

/// Split one stream into `consumers` independent streams
///
/// Each upstream item is pulled once and buffered only until every live
/// consumer has read it; each consumer receives its own copy.
pub fn tee(upstream: ItemStream, consumers: usize) -> Vec<ItemStream> {
    match consumers {
        0 => Vec::new(),
        1 => vec![upstream],
        _ => {
            let state = Rc::new(RefCell::new(TeeState {
                upstream,
                buffer: VecDeque::new(),
                offset: 0,
                cursors: vec![0; consumers],
                exhausted: false,
            }));
            (0..consumers)
                .map(|consumer| {
                    Box::new(TeeHandle {
                        state: state.clone(),
                        consumer,
                    }) as ItemStream
                })
                .collect()
        }
    }
}

struct TeeState {
    upstream: ItemStream,
    buffer: VecDeque<PipeResult<Item>>,
    /// Absolute position of `buffer[0]`
    offset: usize,
    cursors: Vec<usize>,
    exhausted: bool,
}

impl TeeState {
    fn trim(&mut self) {
        let lowest = self.cursors.iter().copied().min().unwrap_or(usize::MAX);
        while self.offset < lowest && self.buffer.pop_front().is_some() {
            self.offset += 1;
        }
    }
}

struct TeeHandle {
    state: Rc<RefCell<TeeState>>,
    consumer: usize,
}

impl Iterator for TeeHandle {
    type Item = PipeResult<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let index = state.cursors[self.consumer] - state.offset;
        let value = match state.buffer.get(index) {
            Some(value) => value.clone(),
            None => {
                if state.exhausted {
                    return None;
                }
                match state.upstream.next() {
                    Some(value) => {
                        state.buffer.push_back(value.clone());
                        value
                    }
                    None => {
                        state.exhausted = true;
                        return None;
                    }
                }
            }
        };

        state.cursors[self.consumer] += 1;
        state.trim();
        Some(value)
    }
}

impl Drop for TeeHandle {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.cursors[self.consumer] = usize::MAX;
            state.trim();
        }
    }
}
