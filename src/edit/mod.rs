//! Editor metadata.
//!
//! During an active edit session every rendered field carries a marker
//! attribute that tells the editor UI which entry field it came from, so
//! clicking the rendered text jumps to the matching input. Outside a
//! session this entire module collapses to "return nothing".
//!
//! Markers live in `$` tables inside the normalized entry:
//! - `fields.<group>.$.<field>` per-group tables,
//! - `fields.$` a flat entry-level table keyed `"group.field"` (also
//!   holding whole-group markers under the bare group key).
//!
//! Repositories often deliver preview payloads without any tables at
//! all; [`annotate`] synthesizes the missing ones from the schema.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::entry::NormalizedEntry;
use crate::model::ContentSchema;
use crate::session::{HintStore, PageContext};

/// Markup attribute markers are emitted under, when the config does not
/// override it.
pub const DEFAULT_EDIT_ATTRIBUTE: &str = "data-edit-tag";

// =============================================================================
// EditTag
// =============================================================================

/// Markup-ready attribute map for one field. Empty outside edit sessions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct EditTag(BTreeMap<String, String>);

impl EditTag {
    pub fn empty() -> Self {
        Self::default()
    }

    fn single(attribute: &str, value: String) -> Self {
        let mut map = BTreeMap::new();
        map.insert(attribute.to_string(), value);
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

// =============================================================================
// EditSession
// =============================================================================

/// Derived per-request state: is this page inside an active editing
/// session, and under which attribute do markers render.
///
/// Deliberately cheap to construct; callers recompute it per tag request
/// instead of caching, so a session ending mid-render stops producing
/// markers immediately.
#[derive(Debug, Clone)]
pub struct EditSession {
    active: bool,
    attribute: String,
}

impl EditSession {
    /// Detect whether an edit session is active.
    ///
    /// Requires the preview feature flag, plus at least one live signal:
    /// an embedding editor, a preview marker in the page URL, or a stored
    /// session hint from an earlier preview cycle.
    pub fn detect(
        ctx: &PageContext,
        hints: &dyn HintStore,
        enabled: bool,
        attribute: &str,
    ) -> Self {
        let active =
            enabled && (ctx.embedded || ctx.url_preview_marker || hints.get().is_some());
        Self {
            active,
            attribute: attribute.to_string(),
        }
    }

    /// A session that is unconditionally off.
    pub fn inactive() -> Self {
        Self {
            active: false,
            attribute: DEFAULT_EDIT_ATTRIBUTE.to_string(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The marker for one `"group.field"` path.
    ///
    /// Lookup precedence, first non-empty wins:
    /// 1. `fields.<group>.$.<field>`
    /// 2. `fields.$["group.field"]`
    /// 3. `fields.$.<group>` (whole-group marker)
    ///
    /// Inactive sessions and malformed paths return the empty tag; this
    /// never panics on strange payloads.
    pub fn tag(&self, entry: &NormalizedEntry, field_path: &str) -> EditTag {
        if !self.active {
            return EditTag::empty();
        }
        let Some((group, field)) = field_path.split_once('.') else {
            return EditTag::empty();
        };
        if group.is_empty() || field.is_empty() {
            return EditTag::empty();
        }
        let Some(fields) = entry.fields() else {
            return EditTag::empty();
        };

        let group_table = fields.get(group).and_then(|g| g.get("$"));
        if let Some(marker) = group_table.and_then(|t| t.get(field))
            && let Some(tag) = self.from_marker(marker)
        {
            return tag;
        }

        let entry_table = fields.get("$");
        if let Some(marker) = entry_table.and_then(|t| t.get(field_path))
            && let Some(tag) = self.from_marker(marker)
        {
            return tag;
        }

        if let Some(marker) = entry_table.and_then(|t| t.get(group))
            && let Some(tag) = self.from_marker(marker)
        {
            return tag;
        }

        EditTag::empty()
    }

    /// A marker value is either a bare tag path (string) or a full
    /// attribute map (object with string values).
    fn from_marker(&self, marker: &Value) -> Option<EditTag> {
        match marker {
            Value::String(path) if !path.is_empty() => {
                Some(EditTag::single(&self.attribute, path.clone()))
            }
            Value::Object(attrs) => {
                let map: BTreeMap<String, String> = attrs
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect();
                if map.is_empty() { None } else { Some(EditTag(map)) }
            }
            _ => None,
        }
    }
}

// =============================================================================
// Marker synthesis
// =============================================================================

/// Ensure every renderer-referenced field of the entry carries a marker.
///
/// Preview payloads often arrive without any `$` tables; an edit session
/// still needs stable markers, so missing ones are synthesized as
/// `{content_type}.{entry_id}.{locale}.{group}.{field}`. Field markers go
/// into the per-group table when the group is an object, into the flat
/// entry table otherwise; whole-group markers always go into the flat
/// table. Existing markers are never overwritten.
///
/// An entry without a uid gets nothing: synthesized paths would collide
/// across entries.
pub fn annotate(entry: &mut NormalizedEntry, schema: &ContentSchema, default_locale: &str) {
    let Some(uid) = entry.uid() else {
        return;
    };
    let entry_id = uid.to_string();
    let locale = entry
        .locale()
        .unwrap_or(default_locale)
        .to_string();
    let content_type = schema.content_type;
    let Some(fields) = entry.fields_mut() else {
        return;
    };

    for group in schema.groups {
        let group_path = format!("{content_type}.{entry_id}.{locale}.{}", group.key);

        ensure_flat_marker(fields, group.key, &group_path);

        let group_is_object = matches!(fields.get(group.key), Some(Value::Object(_)));
        for field in group.fields {
            let field_path = format!("{group_path}.{field}");
            if group_is_object {
                if let Some(Value::Object(group_obj)) = fields.get_mut(group.key) {
                    let table = group_obj
                        .entry("$".to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(table) = table {
                        table
                            .entry(field.to_string())
                            .or_insert(Value::String(field_path));
                    }
                }
            } else {
                ensure_flat_marker(fields, &format!("{}.{field}", group.key), &field_path);
            }
        }
    }
}

/// Insert a marker into the flat entry-level table unless one exists.
fn ensure_flat_marker(fields: &mut Map<String, Value>, key: &str, value: &str) {
    let table = fields
        .entry("$".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(table) = table {
        table
            .entry(key.to_string())
            .or_insert(Value::String(value.to_string()));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RawEntry;
    use crate::entry::normalize;
    use crate::model::schema;
    use crate::session::{MemoryHintStore, StoredHint};
    use serde_json::json;

    fn entry(value: serde_json::Value) -> NormalizedEntry {
        normalize(&RawEntry::new(value), &schema::HOMEPAGE.group_keys())
    }

    fn active_session() -> EditSession {
        EditSession {
            active: true,
            attribute: DEFAULT_EDIT_ATTRIBUTE.to_string(),
        }
    }

    // ------------------------------------------------------------------------
    // Detection
    // ------------------------------------------------------------------------

    #[test]
    fn test_detect_requires_feature_flag() {
        let hints = MemoryHintStore::new();
        let ctx = PageContext {
            embedded: true,
            ..PageContext::standalone()
        };
        let session = EditSession::detect(&ctx, &hints, false, DEFAULT_EDIT_ATTRIBUTE);
        assert!(!session.is_active());
    }

    #[test]
    fn test_detect_signal_sources() {
        let hints = MemoryHintStore::new();

        let none = EditSession::detect(
            &PageContext::standalone(),
            &hints,
            true,
            DEFAULT_EDIT_ATTRIBUTE,
        );
        assert!(!none.is_active());

        let embedded = PageContext {
            embedded: true,
            ..PageContext::standalone()
        };
        assert!(EditSession::detect(&embedded, &hints, true, DEFAULT_EDIT_ATTRIBUTE).is_active());

        let marked = PageContext {
            url_preview_marker: true,
            ..PageContext::standalone()
        };
        assert!(EditSession::detect(&marked, &hints, true, DEFAULT_EDIT_ATTRIBUTE).is_active());

        hints.set(StoredHint::new("blt1"));
        assert!(
            EditSession::detect(
                &PageContext::standalone(),
                &hints,
                true,
                DEFAULT_EDIT_ATTRIBUTE
            )
            .is_active()
        );
    }

    // ------------------------------------------------------------------------
    // Marker lookup
    // ------------------------------------------------------------------------

    #[test]
    fn test_inactive_session_returns_empty_for_everything() {
        let session = EditSession::inactive();
        let e = entry(json!({
            "uid": "e1",
            "fields": { "hero": { "$": { "heading": "homepage.e1.en-us.hero.heading" } } },
        }));
        assert!(session.tag(&e, "hero.heading").is_empty());
        assert!(session.tag(&e, "anything.at.all").is_empty());
    }

    #[test]
    fn test_group_table_wins() {
        let session = active_session();
        let e = entry(json!({
            "uid": "e1",
            "fields": {
                "hero": { "$": { "heading": "from-group" } },
                "$": { "hero.heading": "from-entry", "hero": "from-group-marker" },
            },
        }));

        let tag = session.tag(&e, "hero.heading");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "from-group"
        );
    }

    #[test]
    fn test_entry_table_second() {
        let session = active_session();
        let e = entry(json!({
            "uid": "e1",
            "fields": {
                "hero": { "heading": "Hi" },
                "$": { "hero.heading": "from-entry", "hero": "from-group-marker" },
            },
        }));

        let tag = session.tag(&e, "hero.heading");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "from-entry"
        );
    }

    #[test]
    fn test_group_marker_last() {
        let session = active_session();
        let e = entry(json!({
            "uid": "e1",
            "fields": {
                "hero": { "heading": "Hi" },
                "$": { "hero": "from-group-marker" },
            },
        }));

        let tag = session.tag(&e, "hero.heading");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "from-group-marker"
        );
    }

    #[test]
    fn test_object_marker_spreads_attributes() {
        let session = active_session();
        let e = entry(json!({
            "uid": "e1",
            "fields": {
                "hero": {
                    "$": {
                        "heading": {
                            "data-cslp": "homepage.e1.en-us.hero.heading",
                            "data-cslp-parent": "homepage.e1.en-us.hero",
                        },
                    },
                },
            },
        }));

        let tag = session.tag(&e, "hero.heading");
        assert_eq!(tag.attributes().len(), 2);
        assert_eq!(
            tag.attributes().get("data-cslp").unwrap(),
            "homepage.e1.en-us.hero.heading"
        );
    }

    #[test]
    fn test_malformed_paths_are_empty_not_panics() {
        let session = active_session();
        let e = entry(json!({ "uid": "e1", "fields": {} }));

        assert!(session.tag(&e, "").is_empty());
        assert!(session.tag(&e, "hero").is_empty());
        assert!(session.tag(&e, ".heading").is_empty());
        assert!(session.tag(&e, "hero.").is_empty());
        assert!(session.tag(&e, "missing.field").is_empty());
    }

    #[test]
    fn test_no_content_entry_is_empty() {
        let session = active_session();
        let e = entry(json!({ "uid": "e1" }));
        assert!(session.tag(&e, "hero.heading").is_empty());
    }

    // ------------------------------------------------------------------------
    // Synthesis
    // ------------------------------------------------------------------------

    #[test]
    fn test_annotate_synthesizes_field_and_group_markers() {
        let mut e = entry(json!({
            "uid": "e1",
            "locale": "en-us",
            "hero": { "heading": "Hi" },
        }));
        annotate(&mut e, &schema::HOMEPAGE, "en-us");

        let session = active_session();
        let tag = session.tag(&e, "hero.heading");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "homepage.e1.en-us.hero.heading"
        );

        // Whole-group marker lands in the flat table
        let tag = session.tag(&e, "cta.anything");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "homepage.e1.en-us.cta"
        );
    }

    #[test]
    fn test_annotate_respects_existing_markers() {
        let mut e = entry(json!({
            "uid": "e1",
            "locale": "en-us",
            "fields": {
                "hero": { "heading": "Hi", "$": { "heading": "hand-made" } },
            },
        }));
        annotate(&mut e, &schema::HOMEPAGE, "en-us");

        let session = active_session();
        let tag = session.tag(&e, "hero.heading");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "hand-made"
        );
        // Other fields of the same group still got synthesized
        let tag = session.tag(&e, "hero.subheading");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "homepage.e1.en-us.hero.subheading"
        );
    }

    #[test]
    fn test_annotate_array_group_uses_flat_table() {
        let mut e = entry(json!({
            "uid": "e1",
            "locale": "en-us",
            "benefits": [{ "title": "Fast" }],
        }));
        annotate(&mut e, &schema::HOMEPAGE, "en-us");

        let session = active_session();
        let tag = session.tag(&e, "benefits.items");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "homepage.e1.en-us.benefits.items"
        );
    }

    #[test]
    fn test_annotate_uses_entry_locale_over_default() {
        let mut e = entry(json!({
            "uid": "e1",
            "locale": "fr-fr",
            "hero": { "heading": "Salut" },
        }));
        annotate(&mut e, &schema::HOMEPAGE, "en-us");

        let session = active_session();
        let tag = session.tag(&e, "hero.heading");
        assert_eq!(
            tag.attributes().get(DEFAULT_EDIT_ATTRIBUTE).unwrap(),
            "homepage.e1.fr-fr.hero.heading"
        );
    }

    #[test]
    fn test_annotate_without_uid_is_a_no_op() {
        let mut e = entry(json!({ "hero": { "heading": "Hi" } }));
        let before = e.clone();
        annotate(&mut e, &schema::HOMEPAGE, "en-us");
        assert_eq!(e, before);
    }

    #[test]
    fn test_annotate_is_idempotent() {
        let mut once = entry(json!({
            "uid": "e1",
            "locale": "en-us",
            "hero": { "heading": "Hi" },
        }));
        annotate(&mut once, &schema::HOMEPAGE, "en-us");
        let mut twice = once.clone();
        annotate(&mut twice, &schema::HOMEPAGE, "en-us");
        assert_eq!(once, twice);
    }
}
