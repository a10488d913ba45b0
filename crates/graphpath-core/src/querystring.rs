//! Bracket-encoded query string decoding.
//!
//! Graph descriptions travel as nested form keys, e.g.
//! `User[func]=get&User[columns][name][type]=column`. Each key is split on
//! its bracket segments and the value is written into a nested JSON object.
//! An empty segment (`tags[]=a`) appends using the next numeric index.

use serde_json::{Map, Value};

/// Decode a form/query string into a nested object.
pub fn parse_nested_query(input: &str) -> Map<String, Value> {
    let input = input.strip_prefix('?').unwrap_or(input);
    let mut root = Map::new();

    for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
        let segments = split_key(&key);
        if segments.first().map(|s| s.is_empty()).unwrap_or(true) {
            continue;
        }
        insert(&mut root, &segments, Value::String(value.into_owned()));
    }

    root
}

/// Split `a[b][c]` into `["a", "b", "c"]`. An unterminated bracket ends the split.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            break;
        };
        segments.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    segments
}

fn insert(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };
    let key = if head.is_empty() {
        next_index(target).to_string()
    } else {
        head.clone()
    };

    if tail.is_empty() {
        target.insert(key, value);
        return;
    }

    let slot = target
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(child) = slot {
        insert(child, tail, value);
    }
}

/// One past the largest integer key, or 0 when there is none.
fn next_index(target: &Map<String, Value>) -> u64 {
    target
        .keys()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .map_or(0, |max| max + 1)
}
