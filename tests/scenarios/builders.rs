use crate::helpers::{pipe, run_ok, titled};
use pipegraph::{FixtureSource, InMemoryPipeStore, PipeEngine};
use serde_json::json;

fn engine() -> PipeEngine<InMemoryPipeStore> {
    PipeEngine::new(InMemoryPipeStore::new()).with_fixtures(
        FixtureSource::new().with_feed("http://feed", titled(&["TITLE1", "TITLE2"])),
    )
}

#[test]
fn test_itembuilder_nests_path_segments() {
    let raw = pipe(json!({
        "id": "builder",
        "modules": [
            {"id": "b", "type": "itembuilder", "conf": {"attrs": [
                {"key": {"value": "ATTR1"}, "value": {"value": "VAL1"}},
                {"key": {"value": "attrpath.attr2"}, "value": {"value": "VAL2"}}
            ]}},
            {"id": "out", "type": "output"}
        ],
        "wires": [{"src": {"moduleid": "b"}, "tgt": {"moduleid": "out"}}]
    }));

    let out = run_ok(&engine(), &raw);
    assert_eq!(out, vec![json!({"ATTR1": "VAL1", "attrpath": {"attr2": "VAL2"}})]);
}

#[test]
fn test_itembuilder_merges_shared_prefixes() {
    let raw = pipe(json!({
        "id": "builder",
        "modules": [
            {"id": "b", "type": "itembuilder", "conf": {"attrs": [
                {"key": {"value": "longpath.attrpath.attr3"}, "value": {"value": "VAL3"}},
                {"key": {"value": "attrpath.attr2"}, "value": {"value": "VAL2"}},
                {"key": {"value": "attrpath.attr3"}, "value": {"value": "VAL3"}},
                {"key": {"value": "attr1"}, "value": {"value": "VAL1"}}
            ]}}
        ]
    }));

    let out = run_ok(&engine(), &raw);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["longpath"]["attrpath"]["attr3"], json!("VAL3"));
    assert_eq!(out[0]["attrpath"], json!({"attr2": "VAL2", "attr3": "VAL3"}));
    assert_eq!(out[0]["attr1"], json!("VAL1"));
}

#[test]
fn test_rssitembuilder_around_loop_keeps_outer_fields() {
    let raw = pipe(json!({
        "id": "rss",
        "modules": [
            {"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}},
            {"id": "loop", "type": "loop", "conf": {
                "embed": {"value": {"id": "inner", "type": "itembuilder", "conf": {"attrs": [
                    {"key": {"value": "title"}, "value": {"value": "LOOP"}},
                    {"key": {"value": "summary"}, "value": {"value": "same for all"}}
                ]}}}
            }},
            {"id": "rss", "type": "rssitembuilder", "conf": {
                "link": {"subkey": "title"},
                "description": {"value": ""}
            }},
            {"id": "copy", "type": "rename", "conf": {"RULE": [
                {"op": {"value": "copy"}, "field": {"value": "loop:itembuilder.title"}, "newval": {"value": "newtitle"}}
            ]}},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "feed"}, "tgt": {"moduleid": "loop"}},
            {"src": {"moduleid": "loop"}, "tgt": {"moduleid": "rss"}},
            {"src": {"moduleid": "rss"}, "tgt": {"moduleid": "copy"}},
            {"src": {"moduleid": "copy"}, "tgt": {"moduleid": "out"}}
        ]
    }));

    let out = run_ok(&engine(), &raw);
    assert_eq!(out.len(), 2);

    let block = json!({"title": "LOOP", "summary": "same for all"});
    for (value, title) in out.iter().zip(["TITLE1", "TITLE2"]) {
        assert_eq!(value["title"], json!(title));
        assert_eq!(value["link"], json!(title));
        assert_eq!(value["loop:itembuilder"], block);
        assert_eq!(value["newtitle"], json!("LOOP"));
        assert!(value.get("description").is_none());
    }
}
