use crate::helpers::{pipe, titled, CountingSource};
use pipegraph::{Context, FixtureSource, InMemoryPipeStore, PipeEngine};
use serde_json::json;

const TITLES: &[&str] = &["a", "b", "c", "d", "e", "f", "g", "h"];

fn counting() -> CountingSource {
    CountingSource::new(FixtureSource::new().with_feed("http://feed", titled(TITLES)))
}

fn chain(modules: serde_json::Value) -> serde_json::Value {
    let modules = modules.as_array().cloned().unwrap_or_default();
    let mut all = vec![json!({"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}})];
    all.extend(modules);

    let wires: Vec<_> = all
        .windows(2)
        .map(|pair| {
            let (src, tgt) = (pair[0]["id"].clone(), pair[1]["id"].clone());
            json!({"src": {"moduleid": src}, "tgt": {"moduleid": tgt}})
        })
        .collect();
    json!({"id": "chain", "modules": all, "wires": wires})
}

#[test]
fn test_nothing_is_read_before_the_first_pull() {
    let source = counting();
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(source.clone());

    let mut ctx = Context::default();
    let pipeline = engine.build(&pipe(chain(json!([]))), &mut ctx).unwrap();
    assert_eq!(source.opened(), 0);

    drop(pipeline);
    assert_eq!(source.opened(), 0);
}

#[test]
fn test_dropping_a_partial_run_stops_reads() {
    let source = counting();
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(source.clone());

    let mut ctx = Context::default();
    let raw = pipe(chain(json!([{"id": "rename", "type": "rename", "conf": {"RULE": [
        {"op": {"value": "rename"}, "field": {"value": "title"}, "newval": {"value": "name"}}
    ]}}])));
    let mut pipeline = engine.build(&raw, &mut ctx).unwrap();

    let first = pipeline.next().unwrap().unwrap();
    let second = pipeline.next().unwrap().unwrap();
    assert_eq!(first.get("name"), Some(&json!("a")));
    assert_eq!(second.get("name"), Some(&json!("b")));
    assert_eq!(source.pulled(), 2);

    drop(pipeline);
    assert_eq!(source.opened(), 1);
    assert_eq!(source.pulled(), 2);
}

#[test]
fn test_truncate_stops_pulling_upstream() {
    let source = counting();
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(source.clone());

    let mut ctx = Context::default();
    let raw = pipe(chain(json!([{"id": "cut", "type": "truncate", "conf": {"count": {"value": 3}}}])));
    let out: Vec<_> = engine.build(&raw, &mut ctx).unwrap().collect();

    assert_eq!(out.len(), 3);
    assert_eq!(source.pulled(), 3);
}

#[test]
fn test_buffering_module_reads_everything() {
    let source = counting();
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(source.clone());

    let mut ctx = Context::default();
    let raw = pipe(chain(json!([{"id": "rev", "type": "reverse"}])));
    let mut pipeline = engine.build(&raw, &mut ctx).unwrap();

    let last = pipeline.next().unwrap().unwrap();
    assert_eq!(last.get("title"), Some(&json!("h")));
    assert_eq!(source.pulled(), TITLES.len());
}
