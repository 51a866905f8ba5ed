use crate::helpers::{pipe, run_ok, titled, titles};
use pipegraph::{FixtureSource, InMemoryPipeStore, PipeEngine};
use serde_json::json;

const TITLES: &[&str] = &["alpha", "bravo", "charlie", "delta", "echo"];

fn engine() -> PipeEngine<InMemoryPipeStore> {
    PipeEngine::new(InMemoryPipeStore::new())
        .with_fixtures(FixtureSource::new().with_feed("http://feed", titled(TITLES)))
}

fn truncated(count: usize) -> serde_json::Value {
    json!({
        "id": "truncated",
        "modules": [
            {"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}},
            {"id": "cut", "type": "truncate", "conf": {"count": {"value": count}}},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "feed"}, "tgt": {"moduleid": "cut"}},
            {"src": {"moduleid": "cut"}, "tgt": {"moduleid": "out"}}
        ]
    })
}

#[test]
fn test_truncate_keeps_leading_items() {
    for count in 0..=7 {
        let out = run_ok(&engine(), &pipe(truncated(count)));
        let expected: Vec<String> = TITLES
            .iter()
            .take(count)
            .map(|t| t.to_string())
            .collect();
        assert_eq!(titles(&out), expected, "truncate({})", count);
    }
}

#[test]
fn test_reverse_then_truncate() {
    let raw = pipe(json!({
        "id": "latest",
        "modules": [
            {"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}},
            {"id": "rev", "type": "reverse"},
            {"id": "cut", "type": "truncate", "conf": {"count": {"value": "3"}}},
            {"id": "out", "type": "output"}
        ],
        "wires": [
            {"src": {"moduleid": "feed"}, "tgt": {"moduleid": "rev"}},
            {"src": {"moduleid": "rev"}, "tgt": {"moduleid": "cut"}},
            {"src": {"moduleid": "cut"}, "tgt": {"moduleid": "out"}}
        ]
    }));

    let out = titles(&run_ok(&engine(), &raw));
    assert_eq!(out, vec!["echo", "delta", "charlie"]);
    assert!(out.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn test_sort_descending_then_tail() {
    let raw = pipe(json!({
        "id": "sorted",
        "modules": [
            {"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}},
            {"id": "sort", "type": "sort", "conf": {"KEY": [
                {"field": {"value": "title"}, "dir": {"value": "DESC"}}
            ]}},
            {"id": "last", "type": "tail", "conf": {"count": {"value": 2}}}
        ],
        "wires": [
            {"src": {"moduleid": "feed"}, "tgt": {"moduleid": "sort"}},
            {"src": {"moduleid": "sort"}, "tgt": {"moduleid": "last"}}
        ]
    }));

    let out = titles(&run_ok(&engine(), &raw));
    assert_eq!(out, vec!["bravo", "alpha"]);
}

#[test]
fn test_count_summarizes_feed() {
    let raw = pipe(json!({
        "id": "counted",
        "modules": [
            {"id": "feed", "type": "fetch", "conf": {"URL": {"value": "http://feed"}}},
            {"id": "n", "type": "count"}
        ],
        "wires": [{"src": {"moduleid": "feed"}, "tgt": {"moduleid": "n"}}]
    }));

    assert_eq!(run_ok(&engine(), &raw), vec![json!({"count": 5})]);
}
