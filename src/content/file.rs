//! File-backed content repository.
//!
//! Entries live as JSON documents under the content root:
//! ```text
//! content/
//! └── en-us/
//!     └── homepage/
//!         ├── blt111.json          published entries
//!         └── drafts/
//!             └── blt111.json      draft variants (preview mode only)
//! ```
//!
//! A no-id query selects the latest published entry by `updated_at`
//! (ties broken by uid so the pick is deterministic); in preview mode the
//! draft variant of the picked entry wins when one exists.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use super::{ContentRepository, EntryQuery, FetchMode, RawEntry, RepositoryError};

pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, locale: &str, content_type: &str) -> PathBuf {
        self.root.join(locale).join(content_type)
    }

    /// Read and parse one entry document.
    fn read_entry(path: &Path) -> Result<RawEntry, RepositoryError> {
        let text = fs::read_to_string(path)
            .map_err(|e| RepositoryError::Io(path.to_path_buf(), e))?;
        // Deserializing into a map rejects top-level arrays/scalars up front
        let object: serde_json::Map<String, Value> = serde_json::from_str(&text)
            .map_err(|e| RepositoryError::Malformed(path.display().to_string(), e))?;
        Ok(RawEntry::new(Value::Object(object)))
    }

    /// All entry documents directly inside `dir` (missing dir reads empty).
    fn scan_dir(dir: &Path) -> Result<Vec<RawEntry>, RepositoryError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        let listing =
            fs::read_dir(dir).map_err(|e| RepositoryError::Io(dir.to_path_buf(), e))?;
        for item in listing {
            let item = item.map_err(|e| RepositoryError::Io(dir.to_path_buf(), e))?;
            let path = item.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                entries.push(Self::read_entry(&path)?);
            }
        }
        Ok(entries)
    }

    /// Latest entry by (updated_at, uid). ISO timestamps compare
    /// lexicographically, so plain string ordering is enough.
    fn newest(mut entries: Vec<RawEntry>) -> Option<RawEntry> {
        entries.sort_by(|a, b| {
            let ka = (a.updated_at().unwrap_or(""), a.uid().unwrap_or(""));
            let kb = (b.updated_at().unwrap_or(""), b.uid().unwrap_or(""));
            ka.cmp(&kb)
        });
        entries.pop()
    }

    fn fetch_by_id(
        &self,
        content_type: &str,
        entry_id: &str,
        query: &EntryQuery,
    ) -> Result<RawEntry, RepositoryError> {
        let dir = self.collection_dir(&query.locale, content_type);
        let file = format!("{entry_id}.json");

        if query.mode.is_preview() {
            let draft = dir.join("drafts").join(&file);
            if draft.is_file() {
                return Self::read_entry(&draft);
            }
        }

        let published = dir.join(&file);
        if published.is_file() {
            return Self::read_entry(&published);
        }

        Err(RepositoryError::NotFound(
            content_type.to_string(),
            entry_id.to_string(),
        ))
    }

    fn fetch_latest(
        &self,
        content_type: &str,
        query: &EntryQuery,
    ) -> Result<Option<RawEntry>, RepositoryError> {
        let dir = self.collection_dir(&query.locale, content_type);
        let mut pick = Self::newest(Self::scan_dir(&dir)?);

        if query.mode.is_preview() {
            match &pick {
                Some(entry) => {
                    // Prefer the draft variant of the picked entry
                    if let Some(uid) = entry.uid() {
                        let draft = dir.join("drafts").join(format!("{uid}.json"));
                        if draft.is_file() {
                            pick = Some(Self::read_entry(&draft)?);
                        }
                    }
                }
                None => {
                    // Nothing published yet: fall back to the latest draft
                    pick = Self::newest(Self::scan_dir(&dir.join("drafts"))?);
                }
            }
        }

        Ok(pick)
    }
}

#[async_trait]
impl ContentRepository for FileRepository {
    async fn fetch_entry(
        &self,
        content_type: &str,
        query: &EntryQuery,
    ) -> Result<Option<RawEntry>, RepositoryError> {
        match &query.entry_id {
            Some(id) => self.fetch_by_id(content_type, id, query).map(Some),
            None => self.fetch_latest(content_type, query),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
