//! Entry watcher.
//!
//! Watches the content directory and turns file events into typed
//! entry-change signals for the reconciler, the local stand-in for a CMS
//! push channel.
//!
//! ```text
//! notify → bridge thread → path → EntryChange signal
//! ```
//!
//! Events are forwarded raw; batching and coalescing belong to the
//! reconciler's debounce windows, not here.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::preview::messages::Signal;

/// Check if path is a temp/backup file (editor artifacts)
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Derive (content_type, entry uid) from a changed path under the root.
///
/// Recognized layouts, relative to the content root:
/// `<locale>/<type>/<uid>.json` and `<locale>/<type>/drafts/<uid>.json`.
/// Only changes in `locale` count; other locales never feed this engine.
fn entry_change_for(root: &Path, locale: &str, path: &Path) -> Option<(String, String)> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = rel.components().filter_map(|c| c.as_os_str().to_str());

    if parts.next()? != locale {
        return None;
    }
    let content_type = parts.next()?;
    let mut leaf = parts.next()?;
    if leaf == "drafts" {
        leaf = parts.next()?;
    }
    if parts.next().is_some() {
        return None;
    }

    let uid = leaf.strip_suffix(".json")?;
    if uid.is_empty() {
        return None;
    }
    Some((content_type.to_string(), uid.to_string()))
}

/// Watches content documents and feeds entry-change signals to the
/// reconciler.
pub struct EntryWatcher {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    /// Channel to the reconciler
    signal_tx: mpsc::Sender<Signal>,
    root: PathBuf,
    locale: String,
}

impl EntryWatcher {
    /// Create a new watcher over the content root.
    ///
    /// The watcher starts immediately, buffering events while the caller
    /// finishes wiring up the rest of the actor system.
    pub fn new(
        root: PathBuf,
        locale: String,
        signal_tx: mpsc::Sender<Signal>,
    ) -> notify::Result<Self> {
        // Create sync channel for notify (it doesn't support async)
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        if root.exists() {
            watcher.watch(&root, RecursiveMode::Recursive)?;
        }

        Ok(Self {
            notify_rx,
            _watcher: watcher,
            signal_tx,
            root,
            locale,
        })
    }

    /// Run the watcher loop until the reconciler goes away.
    pub async fn run(self) {
        let notify_rx = self.notify_rx;
        let signal_tx = self.signal_tx;
        let root = self.root;
        let locale = self.locale;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Spawn a thread to poll notify events and send to async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        while let Some(event) = async_rx.recv().await {
            if !event_is_content_change(&event.kind) {
                continue;
            }
            for path in &event.paths {
                if is_temp_file(path) {
                    continue;
                }
                let Some((content_type, entry_id)) = entry_change_for(&root, &locale, path)
                else {
                    continue;
                };
                crate::debug!("watch"; "changed: {}/{}", content_type, entry_id);
                let signal = Signal::EntryChange {
                    content_type,
                    entry_id,
                };
                if signal_tx.send(signal).await.is_err() {
                    return; // Reconciler shut down
                }
            }
        }
    }
}

/// Create, data modify, and remove all mean the entry content changed.
/// Metadata-only modifications (mtime/chmod noise) do not.
fn event_is_content_change(kind: &notify::EventKind) -> bool {
    use notify::EventKind;
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, notify::event::ModifyKind::Metadata(_)),
        _ => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_files_filtered() {
        assert!(is_temp_file(Path::new("/content/.blt1.json.swp")));
        assert!(is_temp_file(Path::new("/content/blt1.json~")));
        assert!(is_temp_file(Path::new("/content/blt1.json.tmp")));
        assert!(!is_temp_file(Path::new("/content/blt1.json")));
    }

    #[test]
    fn test_published_entry_path() {
        let root = Path::new("/site/content");
        let path = Path::new("/site/content/en-us/homepage/blt111.json");
        assert_eq!(
            entry_change_for(root, "en-us", path),
            Some(("homepage".to_string(), "blt111".to_string()))
        );
    }

    #[test]
    fn test_draft_entry_path() {
        let root = Path::new("/site/content");
        let path = Path::new("/site/content/en-us/homepage/drafts/blt111.json");
        assert_eq!(
            entry_change_for(root, "en-us", path),
            Some(("homepage".to_string(), "blt111".to_string()))
        );
    }

    #[test]
    fn test_other_locale_ignored() {
        let root = Path::new("/site/content");
        let path = Path::new("/site/content/fr-fr/homepage/blt111.json");
        assert_eq!(entry_change_for(root, "en-us", path), None);
    }

    #[test]
    fn test_non_entry_paths_ignored() {
        let root = Path::new("/site/content");

        // Not JSON
        assert_eq!(
            entry_change_for(root, "en-us", Path::new("/site/content/en-us/homepage/notes.txt")),
            None
        );
        // Too shallow
        assert_eq!(
            entry_change_for(root, "en-us", Path::new("/site/content/en-us/stray.json")),
            None
        );
        // Too deep
        assert_eq!(
            entry_change_for(
                root,
                "en-us",
                Path::new("/site/content/en-us/homepage/drafts/old/blt1.json")
            ),
            None
        );
        // Outside the root
        assert_eq!(
            entry_change_for(root, "en-us", Path::new("/elsewhere/en-us/homepage/blt1.json")),
            None
        );
    }

    #[test]
    fn test_metadata_events_ignored() {
        use notify::EventKind;
        use notify::event::{MetadataKind, ModifyKind};

        assert!(!event_is_content_change(&EventKind::Modify(
            ModifyKind::Metadata(MetadataKind::Any)
        )));
        assert!(event_is_content_change(&EventKind::Create(
            notify::event::CreateKind::File
        )));
    }
}
