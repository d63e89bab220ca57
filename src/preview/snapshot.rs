//! Committed preview state and content hashing.
//!
//! A [`Snapshot`] is one committed (entry, model) pair plus the blake3
//! hashes change detection runs on. The [`SnapshotStore`] holds the
//! current snapshot behind an `ArcSwapOption`: readers (the HTTP thread,
//! the bridge) load lock-free, the reconciler is the only writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use serde_json::Value;

use crate::content::FetchMode;
use crate::entry::NormalizedEntry;
use crate::model::PageModel;

// =============================================================================
// ContentHash
// =============================================================================

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create a hash representing "no content" (all zeros).
    #[inline]
    pub const fn empty() -> Self {
        Self([0; 32])
    }

    /// Check if this is the empty/zero hash.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 32]
    }

    /// Convert to hex string (for debugging/display).
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string.
    #[allow(dead_code)]
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Some(Self(arr))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Hash a JSON value with object keys visited in sorted order, so two
/// payloads carrying the same content in different key order compare
/// equal.
pub fn hash_value(value: &Value) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hash_into(value, &mut hasher);
    ContentHash::new(*hasher.finalize().as_bytes())
}

/// Type tags and length prefixes keep adjacent values from running into
/// each other in the byte stream.
fn hash_into(value: &Value, hasher: &mut blake3::Hasher) {
    match value {
        Value::Null => {
            hasher.update(b"n");
        }
        Value::Bool(b) => {
            hasher.update(if *b { b"t" } else { b"f" });
        }
        Value::Number(n) => {
            hasher.update(b"#");
            hasher.update(n.to_string().as_bytes());
        }
        Value::String(s) => {
            hasher.update(b"s");
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        Value::Array(items) => {
            hasher.update(b"[");
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                hash_into(item, hasher);
            }
        }
        Value::Object(object) => {
            hasher.update(b"{");
            hasher.update(&(object.len() as u64).to_le_bytes());
            // Keys sorted for determinism
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            for key in keys {
                hasher.update(&(key.len() as u64).to_le_bytes());
                hasher.update(key.as_bytes());
                if let Some(item) = object.get(key.as_str()) {
                    hash_into(item, hasher);
                }
            }
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// One committed preview state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub entry: NormalizedEntry,
    pub model: PageModel,
    pub entry_hash: ContentHash,
    pub model_hash: ContentHash,
    pub content_type: String,
    pub entry_id: Option<String>,
    pub version: Option<u64>,
    pub updated_at: Option<String>,
    pub mode: FetchMode,
}

impl Snapshot {
    pub fn build(
        entry: NormalizedEntry,
        model: PageModel,
        content_type: &str,
        mode: FetchMode,
    ) -> Self {
        let entry_hash = hash_value(entry.as_value());
        let model_hash = hash_value(&model.to_value());
        let entry_id = entry.uid().map(str::to_string);
        let version = entry.version();
        let updated_at = entry.updated_at().map(str::to_string);
        Self {
            entry,
            model,
            entry_hash,
            model_hash,
            content_type: content_type.to_string(),
            entry_id,
            version,
            updated_at,
            mode,
        }
    }

    /// True when both the raw entry and the mapped model hash equal.
    pub fn same_content(&self, other: &Snapshot) -> bool {
        self.entry_hash == other.entry_hash && self.model_hash == other.model_hash
    }
}

// =============================================================================
// SnapshotStore
// =============================================================================

/// Holder of the current committed snapshot.
#[derive(Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
    commits: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed snapshot, if any cycle has committed yet.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Replace the committed snapshot. Returns the commit ordinal.
    pub fn commit(&self, snapshot: Snapshot) -> u64 {
        self.current.store(Some(Arc::new(snapshot)));
        self.commits.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// How many commits have happened since startup.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_hash_display() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(format!("{}", hash), "abababababababab");
    }

    #[test]
    fn test_content_hash_hex_roundtrip() {
        let original = ContentHash::new([0x12; 32]);
        let recovered = ContentHash::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, recovered);
    }

    #[test]
    fn test_hash_ignores_key_order() {
        let a = json!({ "hero": { "heading": "Hi", "subheading": "There" }, "uid": "e1" });
        let b = json!({ "uid": "e1", "hero": { "subheading": "There", "heading": "Hi" } });
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn test_hash_sees_value_changes() {
        let a = json!({ "hero": { "heading": "Hi" } });
        let b = json!({ "hero": { "heading": "Hi!" } });
        assert_ne!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn test_hash_distinguishes_types_and_shapes() {
        assert_ne!(hash_value(&json!("3")), hash_value(&json!(3)));
        assert_ne!(hash_value(&json!({ "a": 1 })), hash_value(&json!(["a", 1])));
        assert_ne!(hash_value(&json!(null)), hash_value(&json!({})));
        // Array order matters, object order does not
        assert_ne!(hash_value(&json!([1, 2])), hash_value(&json!([2, 1])));
    }

    #[test]
    fn test_store_commit_bookkeeping() {
        use crate::model::HomepageModel;

        let store = SnapshotStore::new();
        assert!(store.current().is_none());
        assert_eq!(store.commit_count(), 0);

        let entry: NormalizedEntry =
            serde_json::from_value(json!({ "uid": "e1", "fields": {} })).unwrap();
        let snapshot = Snapshot::build(
            entry,
            PageModel::Homepage(HomepageModel::default()),
            "homepage",
            FetchMode::Production,
        );

        let ordinal = store.commit(snapshot);
        assert_eq!(ordinal, 1);
        assert_eq!(store.commit_count(), 1);

        let held = store.current().unwrap();
        assert_eq!(held.entry_id.as_deref(), Some("e1"));
        assert!(!held.entry_hash.is_empty());
    }
}
