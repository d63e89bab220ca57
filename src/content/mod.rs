//! Content repository boundary.
//!
//! Everything the engine knows about the CMS goes through the
//! [`ContentRepository`] trait: fetch one entry of a content type, either
//! the latest published one (no id) or an exact id, in production or
//! preview mode. Two implementations ship: a directory of JSON documents
//! ([`FileRepository`]) for local serving, and an in-memory table
//! ([`MemoryRepository`]) for tests and embedding.
//!
//! Payload shape is opaque here. Preview endpoints deliver content groups
//! at the top level, delivery endpoints nest them under `fields`; the
//! normalizer owns that distinction, nothing else may look at it.

pub mod file;
pub mod memory;
pub mod watch;

pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use watch::EntryWatcher;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Raw entry payload
// =============================================================================

/// A raw entry payload exactly as the repository returned it.
///
/// Immutable once received: the normalizer works on a deep copy, never on
/// the payload itself. Only the envelope keys (`uid`, `_version`,
/// `updated_at`) have accessors; content groups are deliberately opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEntry(Value);

impl RawEntry {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Entry uid, when the payload carries one.
    pub fn uid(&self) -> Option<&str> {
        self.0.get("uid").and_then(Value::as_str)
    }

    /// Publish version counter, when the payload carries one.
    pub fn version(&self) -> Option<u64> {
        self.0.get("_version").and_then(Value::as_u64)
    }

    /// Last-modified timestamp (ISO-8601 string), when present.
    pub fn updated_at(&self) -> Option<&str> {
        self.0.get("updated_at").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

// =============================================================================
// Query types
// =============================================================================

/// Which content variant a fetch may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Published content only.
    #[default]
    Production,
    /// Draft content included (active editing session).
    Preview,
}

impl FetchMode {
    pub fn is_preview(self) -> bool {
        matches!(self, Self::Preview)
    }
}

/// One entry lookup: an exact id, or the latest published entry when
/// `entry_id` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryQuery {
    pub entry_id: Option<String>,
    pub locale: String,
    pub mode: FetchMode,
}

impl EntryQuery {
    /// Query the latest published entry of the collection.
    pub fn latest(locale: &str, mode: FetchMode) -> Self {
        Self {
            entry_id: None,
            locale: locale.to_string(),
            mode,
        }
    }

    /// Query an exact entry by uid.
    pub fn by_id(entry_id: &str, locale: &str, mode: FetchMode) -> Self {
        Self {
            entry_id: Some(entry_id.to_string()),
            locale: locale.to_string(),
            mode,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// What went wrong while talking to the repository.
///
/// `NotFound` is the only variant with a dedicated recovery path (the
/// caller purges its stored entry hint and retries without an id); the
/// rest are transient and leave previously committed state in place.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested entry id does not exist (deleted, or never published).
    #[error("entry not found: {0}/{1}")]
    NotFound(String, String),

    /// The backing store could not be read.
    #[error("cannot read {0}")]
    Io(PathBuf, #[source] std::io::Error),

    /// The store was reachable but refused or failed the query.
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// The payload exists but is not a valid entry document.
    #[error("malformed entry {0}")]
    Malformed(String, #[source] serde_json::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }
}

// =============================================================================
// Repository trait
// =============================================================================

/// Read access to one CMS collection per call.
///
/// `Ok(None)` means the repository is healthy but the collection has
/// nothing to offer (empty, or nothing published yet). A missing
/// *requested id* is `Err(NotFound)`, not `Ok(None)`: the caller reacts
/// to it by dropping the id, which would be wrong for an empty collection.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn fetch_entry(
        &self,
        content_type: &str,
        query: &EntryQuery,
    ) -> Result<Option<RawEntry>, RepositoryError>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_entry_envelope_accessors() {
        let entry = RawEntry::new(json!({
            "uid": "blt111",
            "_version": 7,
            "updated_at": "2026-03-01T10:00:00Z",
            "hero": { "heading": "Hi" },
        }));

        assert_eq!(entry.uid(), Some("blt111"));
        assert_eq!(entry.version(), Some(7));
        assert_eq!(entry.updated_at(), Some("2026-03-01T10:00:00Z"));
    }

    #[test]
    fn test_raw_entry_missing_envelope() {
        let entry = RawEntry::new(json!({ "hero": {} }));
        assert_eq!(entry.uid(), None);
        assert_eq!(entry.version(), None);
        assert_eq!(entry.updated_at(), None);
    }

    #[test]
    fn test_raw_entry_serde_transparent() {
        let entry = RawEntry::new(json!({ "uid": "e1" }));
        let text = serde_json::to_string(&entry).unwrap();
        assert_eq!(text, r#"{"uid":"e1"}"#);

        let back: RawEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_query_constructors() {
        let latest = EntryQuery::latest("en-us", FetchMode::Production);
        assert_eq!(latest.entry_id, None);
        assert_eq!(latest.locale, "en-us");

        let exact = EntryQuery::by_id("blt42", "en-us", FetchMode::Preview);
        assert_eq!(exact.entry_id.as_deref(), Some("blt42"));
        assert!(exact.mode.is_preview());
    }

    #[test]
    fn test_error_classification() {
        let gone = RepositoryError::NotFound("homepage".into(), "blt1".into());
        assert!(gone.is_not_found());
        assert_eq!(gone.to_string(), "entry not found: homepage/blt1");

        let down = RepositoryError::Unavailable("connection refused".into());
        assert!(!down.is_not_found());
    }
}
