use crate::helpers::{feed, pipe, run_ok, run_to_end, titled, CountingSource};
use pipegraph::{Context, FixtureSource, InMemoryPipeStore, PipeEngine, PipeError};
use serde_json::{json, Value};

fn engine() -> PipeEngine<InMemoryPipeStore> {
    let fixtures = FixtureSource::new()
        .with_feed(
            "http://posts",
            feed(vec![
                json!({"title": "A", "link": "http://a", "tags": ["x", "y"]}),
                json!({"title": "B", "tags": ["z"]}),
                json!({"title": "C", "link": "http://c", "tags": []}),
            ]),
        )
        .with_feed(
            "http://index",
            feed(vec![json!({"feed": "http://posts"}), json!({"feed": "http://gone"})]),
        );
    PipeEngine::new(InMemoryPipeStore::new()).with_fixtures(fixtures)
}

fn looping(conf: Value) -> Value {
    json!({
        "id": "looping",
        "modules": [
            {"id": "posts", "type": "fetch", "conf": {"URL": {"value": "http://posts"}}},
            {"id": "each", "type": "loop", "conf": conf},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "posts"}, "tgt": {"moduleid": "each"}},
            {"src": {"moduleid": "each"}, "tgt": {"moduleid": "out"}}
        ]
    })
}

fn tag_builder() -> Value {
    json!({"value": {"id": "tag", "type": "itembuilder", "conf": {"attrs": [
        {"key": {"value": "tag"}, "value": {"subkey": "content"}}
    ]}}})
}

#[test]
fn test_emit_over_nested_list() {
    let raw = pipe(looping(json!({
        "mode": {"value": "EMIT"},
        "over": {"value": "tags"},
        "embed": tag_builder()
    })));

    let out = run_ok(&engine(), &raw);
    assert_eq!(out, vec![json!({"tag": "x"}), json!({"tag": "y"}), json!({"tag": "z"})]);
}

#[test]
fn test_assign_collects_per_outer_item() {
    let raw = pipe(looping(json!({
        "assign_to": {"value": "labels"},
        "over": {"value": "tags"},
        "embed": tag_builder()
    })));

    let out = run_ok(&engine(), &raw);
    assert_eq!(out.len(), 3);
    assert_eq!(out[0]["labels"], json!([{"tag": "x"}, {"tag": "y"}]));
    assert_eq!(out[1]["labels"], json!({"tag": "z"}));
    assert!(out[2].get("labels").is_none());
    assert_eq!(out[2]["title"], json!("C"));
}

#[test]
fn test_assign_first_result_only() {
    let raw = pipe(looping(json!({
        "assign_to": {"value": "first.tag"},
        "assign_part": {"value": "first"},
        "over": {"value": "tags"},
        "embed": tag_builder()
    })));

    let out = run_ok(&engine(), &raw);
    assert_eq!(out[0]["first"]["tag"], json!({"tag": "x"}));
    assert_eq!(out[1]["first"]["tag"], json!({"tag": "z"}));
}

#[test]
fn test_failed_iteration_is_isolated() {
    let raw = pipe(looping(json!({
        "embed": {"value": {"id": "url", "type": "itembuilder", "conf": {"attrs": [
            {"key": {"value": "href"}, "value": {"subkey": "link"}}
        ]}}}
    })));

    let mut ctx = Context::default();
    let results = run_to_end(&engine(), &raw, &mut ctx).unwrap();
    assert_eq!(results.len(), 3);

    let first = results[0].as_ref().unwrap();
    assert_eq!(first["loop:itembuilder"], json!({"href": "http://a"}));
    assert_eq!(first["title"], json!("A"));

    match &results[1] {
        Err(PipeError::LoopItem { module, index, source }) => {
            assert_eq!(module, "each");
            assert_eq!(*index, 1);
            assert!(matches!(**source, PipeError::PathNotFound(_)));
        }
        other => panic!("expected a loop item error, got {:?}", other),
    }

    let third = results[2].as_ref().unwrap();
    assert_eq!(third["loop:itembuilder"], json!({"href": "http://c"}));
}

#[test]
fn test_loop_body_sees_outer_item_as_scope() {
    let raw = pipe(looping(json!({
        "mode": {"value": "emit"},
        "embed": {"value": {"id": "q", "type": "urlbuilder", "conf": {
            "BASE": {"value": "http://search"},
            "PARAM": [{"key": {"value": "q"}, "value": {"subkey": "title"}}]
        }}}
    })));

    let out = run_ok(&engine(), &raw);
    assert_eq!(
        out,
        vec![
            json!({"url": "http://search/?q=A"}),
            json!({"url": "http://search/?q=B"}),
            json!({"url": "http://search/?q=C"}),
        ]
    );
}

#[test]
fn test_source_body_fetches_per_outer_item() {
    let raw = pipe(json!({
        "id": "crawl",
        "modules": [
            {"id": "index", "type": "fetch", "conf": {"URL": {"value": "http://index"}}},
            {"id": "each", "type": "loop", "conf": {
                "mode": {"value": "emit"},
                "embed": {"value": {"id": "posts", "type": "fetch", "conf": {"URL": {"subkey": "feed"}}}}
            }}
        ],
        "wires": [{"src": {"moduleid": "index"}, "tgt": {"moduleid": "each"}}]
    }));

    let mut ctx = Context::default();
    let results = run_to_end(&engine(), &raw, &mut ctx).unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap()["title"], json!("A"));
    assert_eq!(results[2].as_ref().unwrap()["title"], json!("C"));
    assert!(matches!(
        &results[3],
        Err(PipeError::LoopItem { index: 1, source, .. }) if matches!(**source, PipeError::Source { .. })
    ));
}

#[test]
fn test_source_body_over_list_uses_the_list() {
    let source = CountingSource::new(
        FixtureSource::new()
            .with_feed(
                "http://outer",
                feed(vec![json!({"links": [{"title": "l1"}, {"title": "l2"}]})]),
            )
            .with_feed("http://ext", titled(&["EXTERNAL"])),
    );
    let engine = PipeEngine::new(InMemoryPipeStore::new()).with_source(source.clone());

    let raw = pipe(json!({
        "id": "links",
        "modules": [
            {"id": "outer", "type": "fetch", "conf": {"URL": {"value": "http://outer"}}},
            {"id": "each", "type": "loop", "conf": {
                "mode": {"value": "emit"},
                "over": {"value": "links"},
                "embed": {"value": {"id": "ext", "type": "fetch", "conf": {"URL": {"value": "http://ext"}}}}
            }}
        ],
        "wires": [{"src": {"moduleid": "outer"}, "tgt": {"moduleid": "each"}}]
    }));

    let out = run_ok(&engine, &raw);
    assert_eq!(out, vec![json!({"title": "l1"}), json!({"title": "l2"})]);
    assert_eq!(source.opened(), 1);
}
