//! Page context and session hints.
//!
//! [`PageContext`] captures the signals the engine reads off the page
//! being driven: the entry id and preview marker in its URL, and whether
//! an editor client is currently embedding it. [`HintStore`] is the
//! narrow seam over wherever the session keeps its "last known entry"
//! hint; resolution and reconciliation only ever see the trait.

use percent_encoding::percent_decode_str;
use rustc_hash::FxHashMap;
use url::Url;

/// URL query keys that may carry the entry id.
const ENTRY_ID_KEYS: &[&str] = &["entry_uid", "entry_id", "entryId"];

// =============================================================================
// PageContext
// =============================================================================

/// Where the rendered page believes it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContext {
    /// Entry id from the URL query, when one is present.
    pub url_entry_id: Option<String>,
    /// Preview marker in the URL (`live_preview=…` or `preview=true`).
    pub url_preview_marker: bool,
    /// An editor client is currently embedding the page.
    pub embedded: bool,
}

impl PageContext {
    /// A page with no editing signals at all.
    pub fn standalone() -> Self {
        Self::default()
    }

    /// Parse editing signals out of the page URL.
    ///
    /// Accepts both absolute URLs and bare `path?query` strings; query
    /// values are percent-decoded either way.
    pub fn from_url(url: &str, embedded: bool) -> Self {
        let pairs = query_pairs(url);

        let url_entry_id = ENTRY_ID_KEYS
            .iter()
            .find_map(|key| pairs.get(*key))
            .filter(|id| !id.is_empty())
            .cloned();

        let url_preview_marker = pairs.contains_key("live_preview")
            || pairs
                .get("preview")
                .is_some_and(|v| v == "true" || v == "1");

        Self {
            url_entry_id,
            url_preview_marker,
            embedded,
        }
    }
}

/// Query pairs of an absolute URL or a bare `path?query` string.
fn query_pairs(url: &str) -> FxHashMap<String, String> {
    if let Ok(parsed) = Url::parse(url) {
        return parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
    }

    // No scheme: split off the query and decode by hand
    let Some((_, query)) = url.split_once('?') else {
        return FxHashMap::default();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = percent_decode_str(key).decode_utf8().ok()?;
            let value = percent_decode_str(value).decode_utf8().ok()?;
            Some((key.into_owned(), value.into_owned()))
        })
        .collect()
}

// =============================================================================
// Hint store
// =============================================================================

/// The session's last known entry, carried between fetch cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHint {
    pub entry_id: String,
    pub version: Option<u64>,
    pub updated_at: Option<String>,
}

impl StoredHint {
    pub fn new(entry_id: &str) -> Self {
        Self {
            entry_id: entry_id.to_string(),
            version: None,
            updated_at: None,
        }
    }
}

/// Session-scoped hint storage.
///
/// Writers are idempotent and order-tolerant: `set` replaces, `clear`
/// removes, neither cares what was there before.
pub trait HintStore: Send + Sync {
    fn get(&self) -> Option<StoredHint>;
    fn set(&self, hint: StoredHint);
    fn clear(&self);
}

/// In-process hint store, shared between the reconciler and the HTTP
/// thread.
#[derive(Default)]
pub struct MemoryHintStore {
    hint: parking_lot::Mutex<Option<StoredHint>>,
}

impl MemoryHintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HintStore for MemoryHintStore {
    fn get(&self) -> Option<StoredHint> {
        self.hint.lock().clone()
    }

    fn set(&self, hint: StoredHint) {
        *self.hint.lock() = Some(hint);
    }

    fn clear(&self) {
        *self.hint.lock() = None;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_with_entry_id() {
        let ctx = PageContext::from_url(
            "https://preview.example.com/?live_preview=abc123&entry_uid=blt42",
            false,
        );
        assert_eq!(ctx.url_entry_id.as_deref(), Some("blt42"));
        assert!(ctx.url_preview_marker);
        assert!(!ctx.embedded);
    }

    #[test]
    fn test_bare_path_with_query() {
        let ctx = PageContext::from_url("/?entry_id=blt42&preview=true", true);
        assert_eq!(ctx.url_entry_id.as_deref(), Some("blt42"));
        assert!(ctx.url_preview_marker);
        assert!(ctx.embedded);
    }

    #[test]
    fn test_entry_id_key_aliases() {
        for key in ["entry_uid", "entry_id", "entryId"] {
            let ctx = PageContext::from_url(&format!("/?{key}=e9"), false);
            assert_eq!(ctx.url_entry_id.as_deref(), Some("e9"), "key {key}");
        }
    }

    #[test]
    fn test_percent_decoded_values() {
        let ctx = PageContext::from_url("/?entry_uid=blt%2042", false);
        assert_eq!(ctx.url_entry_id.as_deref(), Some("blt 42"));
    }

    #[test]
    fn test_preview_flag_needs_truthy_value() {
        assert!(!PageContext::from_url("/?preview=false", false).url_preview_marker);
        assert!(!PageContext::from_url("/?preview=", false).url_preview_marker);
        assert!(PageContext::from_url("/?preview=1", false).url_preview_marker);
    }

    #[test]
    fn test_no_query_means_no_signals() {
        let ctx = PageContext::from_url("https://example.com/pricing", false);
        assert_eq!(ctx, PageContext::standalone());
    }

    #[test]
    fn test_empty_entry_id_ignored() {
        let ctx = PageContext::from_url("/?entry_uid=", false);
        assert_eq!(ctx.url_entry_id, None);
    }

    #[test]
    fn test_hint_store_roundtrip() {
        let store = MemoryHintStore::new();
        assert_eq!(store.get(), None);

        store.set(StoredHint {
            entry_id: "blt1".to_string(),
            version: Some(3),
            updated_at: Some("2026-01-01T00:00:00Z".to_string()),
        });
        assert_eq!(store.get().unwrap().entry_id, "blt1");

        // set replaces
        store.set(StoredHint::new("blt2"));
        assert_eq!(store.get().unwrap().entry_id, "blt2");
        assert_eq!(store.get().unwrap().version, None);

        store.clear();
        assert_eq!(store.get(), None);
        // clearing twice is fine
        store.clear();
        assert_eq!(store.get(), None);
    }
}
