use crate::helpers::{feed, pipe, run_ok, titled, titles, CountingSource};
use pipegraph::{FixtureSource, InMemoryPipeStore, PipeEngine};
use serde_json::json;

fn fixtures() -> FixtureSource {
    FixtureSource::new()
        .with_feed(
            "http://one",
            feed(vec![
                json!({"title": "Rust 1.80", "score": 9}),
                json!({"title": "Go 1.23", "score": 7}),
                json!({"title": "Rust in Linux", "score": 3}),
            ]),
        )
        .with_feed(
            "http://two",
            feed(vec![
                json!({"title": "Zig news", "score": 8}),
                json!({"title": "Rust 2024 edition", "score": 6}),
            ]),
        )
        .with_feed("http://empty", Vec::new())
}

fn filtered(second_url: &str) -> serde_json::Value {
    json!({
        "id": "fan-in",
        "modules": [
            {"id": "one", "type": "fetch", "conf": {"URL": {"value": "http://one"}}},
            {"id": "two", "type": "fetch", "conf": {"URL": {"value": second_url}}},
            {"id": "keep", "type": "filter", "conf": {
                "MODE": {"value": "permit"},
                "COMBINE": {"value": "and"},
                "RULE": [{"field": {"value": "title"}, "op": {"value": "contains"}, "value": {"value": "rust"}}]
            }},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "one"}, "tgt": {"moduleid": "keep"}},
            {"src": {"moduleid": "two"}, "tgt": {"moduleid": "keep"}},
            {"src": {"moduleid": "keep"}, "tgt": {"moduleid": "out"}}
        ]
    })
}

#[test]
fn test_filter_over_two_sources_keeps_declaration_order() {
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_fixtures(fixtures());
    let out = run_ok(&engine, &pipe(filtered("http://two")));

    assert_eq!(
        titles(&out),
        vec!["Rust 1.80", "Rust in Linux", "Rust 2024 edition"]
    );
}

#[test]
fn test_filter_with_one_empty_source_is_not_empty() {
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_fixtures(fixtures());
    let out = run_ok(&engine, &pipe(filtered("http://empty")));

    assert_eq!(titles(&out), vec!["Rust 1.80", "Rust in Linux"]);
}

#[test]
fn test_union_concatenates_per_source() {
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_fixtures(fixtures());
    let raw = pipe(json!({
        "id": "union",
        "modules": [
            {"id": "two", "type": "fetch", "conf": {"URL": {"value": "http://two"}}},
            {"id": "one", "type": "fetch", "conf": {"URL": {"value": "http://one"}}},
            {"id": "all", "type": "union"}
        ],
        "wires": [
            {"src": {"moduleid": "one"}, "tgt": {"moduleid": "all", "id": "_INPUT"}},
            {"src": {"moduleid": "two"}, "tgt": {"moduleid": "all", "id": "_OTHER"}}
        ]
    }));

    let out = run_ok(&engine, &raw);
    assert_eq!(
        titles(&out),
        vec!["Rust 1.80", "Go 1.23", "Rust in Linux", "Zig news", "Rust 2024 edition"]
    );
}

#[test]
fn test_shared_output_is_fetched_once() {
    let source = CountingSource::new(
        FixtureSource::new().with_feed("http://feed", titled(&["a", "b", "c", "d"])),
    );
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(source.clone());

    let raw = pipe(json!({
        "id": "fan-out",
        "modules": [
            {"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}},
            {"id": "first", "type": "truncate", "conf": {"count": {"value": 1}}},
            {"id": "rev", "type": "reverse"},
            {"id": "all", "type": "union"}
        ],
        "wires": [
            {"src": {"moduleid": "feed"}, "tgt": {"moduleid": "first"}},
            {"src": {"moduleid": "feed"}, "tgt": {"moduleid": "rev"}},
            {"src": {"moduleid": "first"}, "tgt": {"moduleid": "all"}},
            {"src": {"moduleid": "rev"}, "tgt": {"moduleid": "all", "id": "_OTHER"}}
        ]
    }));

    let out = run_ok(&engine, &raw);
    assert_eq!(titles(&out), vec!["a", "d", "c", "b", "a"]);
    assert_eq!(source.opened(), 1);
    assert_eq!(source.pulled(), 4);
}
