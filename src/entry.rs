//! Entry normalization.
//!
//! Raw payloads arrive in two shapes: delivery responses nest content
//! groups under a `fields` container, preview responses put the same
//! groups at the top level of the entry. Everything downstream assumes
//! exactly one shape, so all shape detection lives here and only here.
//!
//! `normalize` rewrites a preview-shaped payload by moving every
//! non-reserved container value under a fresh `fields` container. Already
//! delivery-shaped payloads pass through untouched, which also makes the
//! operation idempotent. A payload with neither a `fields` container nor
//! any recognized group is left alone so that "no content at all" stays
//! observable downstream as [`NormalizedEntry::fields`] returning `None`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::RawEntry;

/// Envelope keys that never count as content, on top of the blanket rule
/// that `_`-prefixed keys are internal.
const RESERVED_KEYS: &[&str] = &[
    "uid",
    "locale",
    "tags",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
    "publish_details",
    "ACL",
];

fn is_reserved(key: &str) -> bool {
    key.starts_with('_') || RESERVED_KEYS.contains(&key)
}

/// A content-bearing value is a non-reserved object or array.
fn is_content_container(key: &str, value: &Value) -> bool {
    !is_reserved(key) && (value.is_object() || value.is_array())
}

// =============================================================================
// NormalizedEntry
// =============================================================================

/// An entry payload with all content groups under one `fields` container.
///
/// Produced exclusively by [`normalize`]; the mapper and the metadata
/// resolver only ever see this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedEntry(Value);

impl NormalizedEntry {
    pub fn uid(&self) -> Option<&str> {
        self.0.get("uid").and_then(Value::as_str)
    }

    pub fn locale(&self) -> Option<&str> {
        self.0.get("locale").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<u64> {
        self.0.get("_version").and_then(Value::as_u64)
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.0.get("updated_at").and_then(Value::as_str)
    }

    /// The canonical content container.
    ///
    /// `None` means the payload carried no recognizable content at all,
    /// which mappers translate to "render nothing" rather than an empty
    /// model.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.0.get("fields").and_then(Value::as_object)
    }

    pub fn fields_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0.get_mut("fields").and_then(Value::as_object_mut)
    }

    /// One content group out of the container.
    pub fn group(&self, key: &str) -> Option<&Value> {
        self.fields().and_then(|fields| fields.get(key))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

// =============================================================================
// normalize
// =============================================================================

/// Rewrite a raw payload into the canonical delivery shape.
///
/// `groups` is the schema's group-key list for the entry's content type;
/// a payload without a `fields` container counts as preview-shaped only
/// when at least one of these keys is present at the top level.
///
/// The raw payload is never mutated; the result is a reshaped deep copy.
pub fn normalize(raw: &RawEntry, groups: &[&str]) -> NormalizedEntry {
    let value = raw.as_value();
    let Some(object) = value.as_object() else {
        return NormalizedEntry(value.clone());
    };

    let preview_shaped =
        !object.contains_key("fields") && groups.iter().any(|g| object.contains_key(*g));
    if !preview_shaped {
        return NormalizedEntry(value.clone());
    }

    let mut reshaped = object.clone();
    let mut fields = Map::new();

    let content_keys: Vec<String> = reshaped
        .iter()
        .filter(|(k, v)| is_content_container(k, v))
        .map(|(k, _)| k.clone())
        .collect();
    // Move, not copy: leaving the top-level duplicates behind would make
    // the two source shapes of identical content serialize differently
    for key in content_keys {
        if let Some(group) = reshaped.remove(&key) {
            fields.insert(key, group);
        }
    }

    reshaped.insert("fields".to_string(), Value::Object(fields));
    NormalizedEntry(Value::Object(reshaped))
}

// =============================================================================
// Tests
// =============================================================================
