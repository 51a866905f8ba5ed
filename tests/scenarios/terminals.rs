use crate::helpers::{feed, pipe, titled, titles, CountingSource};
use pipegraph::{Context, FixtureSource, InMemoryPipeStore, PipeEngine};
use serde_json::{json, Value};

fn counting() -> CountingSource {
    CountingSource::new(
        FixtureSource::new()
            .with_feed("http://topics", feed(vec![json!({"topic": "rust"}), json!({"topic": "go"})]))
            .with_feed("http://feeds/?t=rust", titled(&["r1", "r2"]))
            .with_feed("http://feeds/?t=go", titled(&["g1"])),
    )
}

fn per_topic() -> Value {
    json!({
        "id": "per-topic",
        "modules": [
            {"id": "topics", "type": "fetch", "conf": {"URL": {"value": "http://topics"}}},
            {"id": "query", "type": "urlbuilder", "conf": {
                "BASE": {"value": "http://feeds"},
                "PARAM": [{"key": {"value": "t"}, "value": {"subkey": "topic"}}]
            }},
            {"id": "posts", "type": "fetch", "conf": {"URL": {"terminal": "URL", "type": "url"}}},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "topics"}, "tgt": {"moduleid": "query"}},
            {"src": {"moduleid": "query"}, "tgt": {"moduleid": "posts", "id": "URL"}},
            {"src": {"moduleid": "posts"}, "tgt": {"moduleid": "out"}}
        ]
    })
}

#[test]
fn test_urlbuilder_feeds_fetch_url_terminal() {
    let source = counting();
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(source.clone());

    let mut ctx = Context::default();
    let out: Vec<Value> = engine
        .build(&pipe(per_topic()), &mut ctx)
        .unwrap()
        .map(|result| Value::from(result.unwrap()))
        .collect();

    assert_eq!(titles(&out), vec!["r1", "r2", "g1"]);
    assert_eq!(source.opened(), 3);
}

#[test]
fn test_terminal_fed_fetch_is_lazy() {
    let source = counting();
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(source.clone());

    let mut ctx = Context::default();
    let mut pipeline = engine.build(&pipe(per_topic()), &mut ctx).unwrap();
    assert_eq!(source.opened(), 0);

    let first = pipeline.next().unwrap().unwrap();
    assert_eq!(first.get("title"), Some(&json!("r1")));
    assert_eq!(source.opened(), 2);
}

#[test]
fn test_unwired_param_terminal_fails_per_item() {
    let raw = pipe(json!({
        "modules": [{"id": "posts", "type": "fetch", "conf": {"URL": {"terminal": "URL"}}}]
    }));
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(counting());

    let results: Vec<_> = engine.build(&raw, &mut Context::default()).unwrap().collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}
