//! Field access helpers for mapping normalized entries.
//!
//! CMS payloads are erratically shaped: the same logical field shows up
//! under different names depending on schema age, and repeatable content
//! is sometimes a keyed array, sometimes a keyed single object, sometimes
//! the group itself. Mappers express each lookup as an ordered candidate
//! list through these helpers instead of inline branching, so the
//! precedence is testable in isolation.
//!
//! Paths are dot-separated lookups inside one group ("action.title").

use serde_json::{Map, Value};

/// Walk a dotted path inside a value.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Group accessor that treats a missing group as an empty one.
pub fn group<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a Value {
    static EMPTY: Value = Value::Null;
    fields.get(key).unwrap_or(&EMPTY)
}

/// First candidate path resolving to a non-null value.
pub fn pick<'a>(group: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| lookup(group, path))
        .find(|value| !value.is_null())
}

/// First candidate resolving to a non-empty string, else the default.
pub fn text(group: &Value, paths: &[&str], default: &str) -> String {
    paths
        .iter()
        .filter_map(|path| lookup(group, path))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

/// Link target. Absent or empty resolves to the inert anchor `"#"` so
/// renderers never emit a dead `href=""`.
pub fn href(group: &Value, paths: &[&str]) -> String {
    text(group, paths, "#")
}

/// Icon name with a caller-supplied default.
pub fn icon(group: &Value, paths: &[&str], default: &str) -> String {
    text(group, paths, default)
}

/// Boolean flag.
pub fn flag(group: &Value, paths: &[&str], default: bool) -> bool {
    pick(group, paths).and_then(Value::as_bool).unwrap_or(default)
}

/// Star rating, clamped to 1..=5. Absent or unparsable means full marks.
pub fn rating(group: &Value, paths: &[&str]) -> u8 {
    let n = match pick(group, paths) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(5.0),
        Some(Value::String(s)) => s.parse().unwrap_or(5.0),
        _ => 5.0,
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (n.round() as i64).clamp(1, 5) as u8
    }
}

/// List of strings. Accepts an array of strings (non-strings skipped) or
/// a bare string as a one-element list.
pub fn string_list(group: &Value, paths: &[&str]) -> Vec<String> {
    match pick(group, paths) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Repeatable content, by fixed precedence:
/// 1. first candidate key holding an array
/// 2. first candidate key holding a single object (one-element collection)
/// 3. the group itself is an array
/// 4. empty
///
/// Arrays win over single objects across all keys, so an explicit items
/// array is never shadowed by an earlier key that happens to hold one
/// record.
pub fn collection<'a>(group: &'a Value, item_keys: &[&str]) -> Vec<&'a Value> {
    for key in item_keys {
        if let Some(Value::Array(items)) = lookup(group, key) {
            return items.iter().collect();
        }
    }
    for key in item_keys {
        if let Some(value @ Value::Object(_)) = lookup(group, key) {
            return vec![value];
        }
    }
    if let Value::Array(items) = group {
        return items.iter().collect();
    }
    Vec::new()
}

/// [`collection`] minus unexpanded reference stubs.
pub fn expanded<'a>(group: &'a Value, item_keys: &[&str]) -> Vec<&'a Value> {
    collection(group, item_keys)
        .into_iter()
        .filter(|value| !is_stub(value))
        .collect()
}

/// True when a reference element carries nothing a renderer could show.
///
/// Repositories deliver unexpanded references as bare id strings or as
/// objects holding only identity metadata (uid, type, locale). Anything
/// that is not an object with at least one content key counts as a stub.
pub fn is_stub(element: &Value) -> bool {
    match element {
        Value::Object(object) => object.keys().all(|k| is_identity_key(k)),
        _ => true,
    }
}

fn is_identity_key(key: &str) -> bool {
    key.starts_with('_')
        || matches!(key, "uid" | "id" | "content_type_uid" | "locale" | "$")
}

// =============================================================================
// Tests
// =============================================================================
