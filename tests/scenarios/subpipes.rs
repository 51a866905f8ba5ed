use crate::helpers::{pipe, run_ok, run_to_end, titled, titles, CountingStore};
use pipegraph::core::Settings;
use pipegraph::{Context, FixtureSource, InMemoryPipeStore, Mode, PipeEngine, PipeError};
use serde_json::json;

fn reverser() -> serde_json::Value {
    json!({
        "modules": [
            {"id": "in", "type": "input"},
            {"id": "rev", "type": "reverse"},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "in"}, "tgt": {"moduleid": "rev"}},
            {"src": {"moduleid": "rev"}, "tgt": {"moduleid": "out"}}
        ]
    })
}

fn greeter() -> serde_json::Value {
    json!({
        "modules": [
            {"id": "who", "type": "textinput", "conf": {
                "name": {"value": "who"},
                "default": {"value": "world"}
            }},
            {"id": "greet", "type": "rename", "conf": {"RULE": [
                {"op": {"value": "copy"}, "field": {"value": "content"}, "newval": {"value": "greeting"}}
            ]}},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "who"}, "tgt": {"moduleid": "greet"}},
            {"src": {"moduleid": "greet"}, "tgt": {"moduleid": "out"}}
        ]
    })
}

fn store() -> InMemoryPipeStore {
    InMemoryPipeStore::new()
        .with_pipe("reverser", pipe(reverser()))
        .with_pipe("greeter", pipe(greeter()))
}

fn fixtures() -> FixtureSource {
    FixtureSource::new().with_feed("http://feed", titled(&["a", "b", "c"]))
}

#[test]
fn test_subpipe_reads_embedding_stream() {
    let engine = PipeEngine::new(store()).with_fixtures(fixtures());
    let raw = pipe(json!({
        "id": "outer",
        "modules": [
            {"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}},
            {"id": "sub", "type": "pipe:reverser"},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "feed"}, "tgt": {"moduleid": "sub"}},
            {"src": {"moduleid": "sub"}, "tgt": {"moduleid": "out"}}
        ]
    }));

    assert_eq!(titles(&run_ok(&engine, &raw)), vec!["c", "b", "a"]);
}

#[test]
fn test_repeated_subpipe_is_looked_up_once() {
    let counting = CountingStore::new(store());
    let engine = PipeEngine::new(&counting).with_fixtures(fixtures());
    let raw = pipe(json!({
        "id": "outer",
        "modules": [
            {"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}},
            {"id": "once", "type": "pipe:reverser"},
            {"id": "twice", "type": "pipe:reverser"},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "feed"}, "tgt": {"moduleid": "once"}},
            {"src": {"moduleid": "once"}, "tgt": {"moduleid": "twice"}},
            {"src": {"moduleid": "twice"}, "tgt": {"moduleid": "out"}}
        ]
    }));

    let mut ctx = Context::default();
    let graph = engine.compile(&raw, &mut ctx).unwrap();
    assert_eq!(counting.lookups(), 1);
    assert_eq!(ctx.store_lookups(), 1);
    assert_eq!(ctx.cached_pipe_ids(), vec!["reverser"]);

    let out: Vec<_> = engine
        .run(&graph, &ctx)
        .map(|r| serde_json::Value::from(r.unwrap()))
        .collect();
    assert_eq!(titles(&out), vec!["a", "b", "c"]);
}

#[test]
fn test_subpipe_params_bind_text_inputs() {
    let engine = PipeEngine::new(store());
    let raw = pipe(json!({
        "id": "outer",
        "modules": [
            {"id": "hello", "type": "pipe:greeter", "conf": {"who": {"value": "rust"}}},
            {"id": "plain", "type": "pipe:greeter"},
            {"id": "all", "type": "union"}
        ],
        "wires": [
            {"src": {"moduleid": "hello"}, "tgt": {"moduleid": "all"}},
            {"src": {"moduleid": "plain"}, "tgt": {"moduleid": "all"}}
        ]
    }));

    let out = run_ok(&engine, &raw);
    assert_eq!(
        out,
        vec![
            json!({"content": "rust", "greeting": "rust"}),
            json!({"content": "world", "greeting": "world"}),
        ]
    );
}

#[test]
fn test_live_inputs_reach_subpipes_unless_bound() {
    let engine = PipeEngine::new(store());
    let raw = pipe(json!({
        "id": "outer",
        "modules": [{"id": "plain", "type": "pipe:greeter"}]
    }));

    let mut ctx = Context::with_settings(Settings {
        mode: Mode::Live,
        ..Settings::default()
    })
    .with_input("who", "caller");
    let out: Vec<_> = run_to_end(&engine, &raw, &mut ctx)
        .unwrap()
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(out, vec![json!({"content": "caller", "greeting": "caller"})]);

    let mut ctx = Context::new(Mode::Test).with_input("who", "caller");
    let out: Vec<_> = run_to_end(&engine, &raw, &mut ctx)
        .unwrap()
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(out, vec![json!({"content": "world", "greeting": "world"})]);
}

#[test]
fn test_mutual_embedding_fails_before_items() {
    let store = InMemoryPipeStore::new()
        .with_pipe("a", pipe(json!({"modules": [{"id": "b", "type": "pipe:b"}]})))
        .with_pipe("b", pipe(json!({"modules": [{"id": "a", "type": "pipe:a"}]})));
    let engine = PipeEngine::new(store);
    let raw = pipe(json!({
        "id": "outer",
        "modules": [{"id": "sub", "type": "pipe:a"}]
    }));

    let mut ctx = Context::default();
    let err = run_to_end(&engine, &raw, &mut ctx).unwrap_err();
    match err {
        PipeError::CyclicReference { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
        other => panic!("expected a cyclic reference, got {:?}", other),
    }
}

#[test]
fn test_unknown_subpipe_fails_to_compile() {
    let engine = PipeEngine::new(InMemoryPipeStore::new());
    let raw = pipe(json!({"modules": [{"id": "sub", "type": "pipe:ghost"}]}));

    let mut ctx = Context::default();
    let err = engine.compile(&raw, &mut ctx).unwrap_err();
    assert_eq!(err, PipeError::PipeNotFound("ghost".to_string()));
}
