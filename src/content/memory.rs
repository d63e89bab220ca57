//! In-memory content repository.
//!
//! Backs tests and embedded use with the same query semantics as the
//! file-backed repository: by-id lookups, latest-published selection,
//! draft preference in preview mode. Also counts fetches, which the
//! reconciler tests lean on.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{ContentRepository, EntryQuery, RawEntry, RepositoryError};

#[derive(Clone)]
struct StoredEntry {
    entry: RawEntry,
    draft: bool,
}

#[derive(Default)]
pub struct MemoryRepository {
    /// "{locale}/{content_type}" → entries of that collection
    collections: DashMap<String, Vec<StoredEntry>>,
    fetches: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(locale: &str, content_type: &str) -> String {
        format!("{locale}/{content_type}")
    }

    /// Insert or replace a published entry.
    pub fn insert(&self, locale: &str, content_type: &str, value: Value) {
        self.store(locale, content_type, value, false);
    }

    /// Insert or replace a draft variant.
    pub fn insert_draft(&self, locale: &str, content_type: &str, value: Value) {
        self.store(locale, content_type, value, true);
    }

    fn store(&self, locale: &str, content_type: &str, value: Value, draft: bool) {
        let entry = RawEntry::new(value);
        let mut collection = self
            .collections
            .entry(Self::key(locale, content_type))
            .or_default();
        // One slot per (uid, draftness)
        collection.retain(|s| !(s.draft == draft && s.entry.uid() == entry.uid()));
        collection.push(StoredEntry { entry, draft });
    }

    /// Remove every variant of an entry. Returns true when something left.
    pub fn remove(&self, locale: &str, content_type: &str, uid: &str) -> bool {
        let Some(mut collection) = self.collections.get_mut(&Self::key(locale, content_type))
        else {
            return false;
        };
        let before = collection.len();
        collection.retain(|s| s.entry.uid() != Some(uid));
        collection.len() != before
    }

    /// How many fetches this repository has answered.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Simulate an outage: while set, every fetch fails with
    /// [`RepositoryError::Unavailable`].
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn newest(mut candidates: Vec<RawEntry>) -> Option<RawEntry> {
        candidates.sort_by(|a, b| {
            let ka = (a.updated_at().unwrap_or(""), a.uid().unwrap_or(""));
            let kb = (b.updated_at().unwrap_or(""), b.uid().unwrap_or(""));
            ka.cmp(&kb)
        });
        candidates.pop()
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn fetch_entry(
        &self,
        content_type: &str,
        query: &EntryQuery,
    ) -> Result<Option<RawEntry>, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "simulated outage".to_string(),
            ));
        }

        let key = Self::key(&query.locale, content_type);
        let collection: Vec<StoredEntry> = self
            .collections
            .get(&key)
            .map(|c| c.clone())
            .unwrap_or_default();
        let preview = query.mode.is_preview();

        match &query.entry_id {
            Some(id) => {
                let variant = |want_draft: bool| {
                    collection
                        .iter()
                        .find(|s| s.draft == want_draft && s.entry.uid() == Some(id.as_str()))
                        .map(|s| s.entry.clone())
                };
                let hit = if preview {
                    variant(true).or_else(|| variant(false))
                } else {
                    variant(false)
                };
                match hit {
                    Some(entry) => Ok(Some(entry)),
                    None => Err(RepositoryError::NotFound(
                        content_type.to_string(),
                        id.clone(),
                    )),
                }
            }
            None => {
                let published: Vec<RawEntry> = collection
                    .iter()
                    .filter(|s| !s.draft)
                    .map(|s| s.entry.clone())
                    .collect();
                let mut pick = Self::newest(published);

                if preview {
                    match &pick {
                        Some(entry) => {
                            if let Some(uid) = entry.uid()
                                && let Some(draft) = collection
                                    .iter()
                                    .find(|s| s.draft && s.entry.uid() == Some(uid))
                            {
                                pick = Some(draft.entry.clone());
                            }
                        }
                        None => {
                            let drafts: Vec<RawEntry> = collection
                                .iter()
                                .filter(|s| s.draft)
                                .map(|s| s.entry.clone())
                                .collect();
                            pick = Self::newest(drafts);
                        }
                    }
                }

                Ok(pick)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FetchMode;
    use serde_json::json;

    #[tokio::test]
    async fn test_draft_shadows_published_in_preview() {
        let repo = MemoryRepository::new();
        repo.insert(
            "en-us",
            "homepage",
            json!({ "uid": "e1", "_version": 2, "updated_at": "2026-01-02T00:00:00Z" }),
        );
        repo.insert_draft(
            "en-us",
            "homepage",
            json!({ "uid": "e1", "_version": 3, "updated_at": "2026-01-03T00:00:00Z" }),
        );

        let prod = EntryQuery::latest("en-us", FetchMode::Production);
        let entry = repo.fetch_entry("homepage", &prod).await.unwrap().unwrap();
        assert_eq!(entry.version(), Some(2));

        let preview = EntryQuery::latest("en-us", FetchMode::Preview);
        let entry = repo.fetch_entry("homepage", &preview).await.unwrap().unwrap();
        assert_eq!(entry.version(), Some(3));
    }

    #[tokio::test]
    async fn test_insert_replaces_same_uid() {
        let repo = MemoryRepository::new();
        repo.insert("en-us", "homepage", json!({ "uid": "e1", "_version": 1 }));
        repo.insert("en-us", "homepage", json!({ "uid": "e1", "_version": 2 }));

        let query = EntryQuery::by_id("e1", "en-us", FetchMode::Production);
        let entry = repo.fetch_entry("homepage", &query).await.unwrap().unwrap();
        assert_eq!(entry.version(), Some(2));
    }

    #[tokio::test]
    async fn test_removed_entry_is_not_found() {
        let repo = MemoryRepository::new();
        repo.insert("en-us", "homepage", json!({ "uid": "e1" }));
        assert!(repo.remove("en-us", "homepage", "e1"));

        let query = EntryQuery::by_id("e1", "en-us", FetchMode::Preview);
        let err = repo.fetch_entry("homepage", &query).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_count() {
        let repo = MemoryRepository::new();
        let query = EntryQuery::latest("en-us", FetchMode::Production);

        assert_eq!(repo.fetch_count(), 0);
        let _ = repo.fetch_entry("homepage", &query).await;
        let _ = repo.fetch_entry("homepage", &query).await;
        assert_eq!(repo.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_outage_switch() {
        let repo = MemoryRepository::new();
        repo.insert("en-us", "homepage", json!({ "uid": "e1" }));
        repo.set_unavailable(true);

        let query = EntryQuery::latest("en-us", FetchMode::Production);
        let err = repo.fetch_entry("homepage", &query).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable(_)));

        repo.set_unavailable(false);
        assert!(repo.fetch_entry("homepage", &query).await.unwrap().is_some());
    }
}
