//! Entry resolution policy.
//!
//! Decides, per fetch cycle, which entry to load and in which mode. The
//! precedence ladder: an explicit id from a push signal, the id in the
//! page URL when paired with an editing signal, the session's stored
//! hint while embedded, else the latest published entry.

use crate::content::FetchMode;
use crate::session::{HintStore, PageContext};

/// What the next fetch targets. Created per cycle, never persisted
/// beyond it except as the stored hint for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub content_type: String,
    pub entry_id: Option<String>,
    pub mode: FetchMode,
}

/// Resolve which entry the next fetch targets.
///
/// `explicit` carries the entry id of the push signal that triggered the
/// cycle, when there was one. `preview_enabled` is the feature flag;
/// with it off everything resolves to production regardless of signals.
///
/// The one side effect: a resolution that lands on plain production
/// clears the stored hint, so a stale preview session cannot leak an old
/// draft id into later production fetches.
pub fn resolve_target(
    content_type: &str,
    explicit: Option<&str>,
    ctx: &PageContext,
    hints: &dyn HintStore,
    preview_enabled: bool,
) -> ResolvedTarget {
    let editing_signal = ctx.embedded || ctx.url_preview_marker;
    let mode = if preview_enabled && editing_signal {
        FetchMode::Preview
    } else {
        FetchMode::Production
    };

    // 1. Push signals name their entry outright
    if let Some(id) = explicit {
        return ResolvedTarget {
            content_type: content_type.to_string(),
            entry_id: Some(id.to_string()),
            mode,
        };
    }

    // 2. The page URL names one, trusted only alongside an editing signal
    if let Some(id) = &ctx.url_entry_id
        && editing_signal
    {
        return ResolvedTarget {
            content_type: content_type.to_string(),
            entry_id: Some(id.clone()),
            mode,
        };
    }

    // 3. Embedded without a URL id: whatever the session remembers
    if ctx.embedded {
        return ResolvedTarget {
            content_type: content_type.to_string(),
            entry_id: hints.get().map(|hint| hint.entry_id),
            mode,
        };
    }

    // 4. No usable signals: latest published entry, stale hint dropped
    if mode == FetchMode::Production {
        hints.clear();
    }
    ResolvedTarget {
        content_type: content_type.to_string(),
        entry_id: None,
        mode,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryHintStore, StoredHint};

    fn embedded_ctx() -> PageContext {
        PageContext {
            embedded: true,
            ..PageContext::standalone()
        }
    }

    #[test]
    fn test_explicit_id_wins() {
        let hints = MemoryHintStore::new();
        hints.set(StoredHint::new("stored"));
        let ctx = PageContext {
            url_entry_id: Some("from-url".to_string()),
            ..embedded_ctx()
        };

        let target = resolve_target("homepage", Some("pushed"), &ctx, &hints, true);
        assert_eq!(target.entry_id.as_deref(), Some("pushed"));
        assert_eq!(target.mode, FetchMode::Preview);
    }

    #[test]
    fn test_url_id_requires_editing_signal() {
        let hints = MemoryHintStore::new();
        let ctx = PageContext {
            url_entry_id: Some("from-url".to_string()),
            ..PageContext::standalone()
        };

        // No embedding, no marker: the URL id is not trusted
        let target = resolve_target("homepage", None, &ctx, &hints, true);
        assert_eq!(target.entry_id, None);
        assert_eq!(target.mode, FetchMode::Production);
    }

    #[test]
    fn test_url_id_with_preview_marker() {
        let hints = MemoryHintStore::new();
        let ctx = PageContext {
            url_entry_id: Some("from-url".to_string()),
            url_preview_marker: true,
            ..PageContext::standalone()
        };

        let target = resolve_target("homepage", None, &ctx, &hints, true);
        assert_eq!(target.entry_id.as_deref(), Some("from-url"));
        assert_eq!(target.mode, FetchMode::Preview);
    }

    #[test]
    fn test_embedded_falls_back_to_stored_hint() {
        let hints = MemoryHintStore::new();
        hints.set(StoredHint::new("stored"));

        let target = resolve_target("homepage", None, &embedded_ctx(), &hints, true);
        assert_eq!(target.entry_id.as_deref(), Some("stored"));
        assert_eq!(target.mode, FetchMode::Preview);
        // Preview resolution leaves the hint alone
        assert!(hints.get().is_some());
    }

    #[test]
    fn test_embedded_without_hint_fetches_latest_preview() {
        let hints = MemoryHintStore::new();

        let target = resolve_target("homepage", None, &embedded_ctx(), &hints, true);
        assert_eq!(target.entry_id, None);
        assert_eq!(target.mode, FetchMode::Preview);
    }

    #[test]
    fn test_plain_production_clears_hint() {
        let hints = MemoryHintStore::new();
        hints.set(StoredHint::new("stale"));

        let target = resolve_target("homepage", None, &PageContext::standalone(), &hints, true);
        assert_eq!(target.entry_id, None);
        assert_eq!(target.mode, FetchMode::Production);
        assert_eq!(hints.get(), None);
    }

    #[test]
    fn test_disabled_flag_forces_production() {
        let hints = MemoryHintStore::new();

        let target = resolve_target("homepage", Some("pushed"), &embedded_ctx(), &hints, false);
        assert_eq!(target.entry_id.as_deref(), Some("pushed"));
        assert_eq!(target.mode, FetchMode::Production);
    }

    #[test]
    fn test_marker_only_resolution_keeps_hint() {
        let hints = MemoryHintStore::new();
        hints.set(StoredHint::new("kept"));
        let ctx = PageContext {
            url_preview_marker: true,
            ..PageContext::standalone()
        };

        let target = resolve_target("homepage", None, &ctx, &hints, true);
        assert_eq!(target.entry_id, None);
        assert_eq!(target.mode, FetchMode::Preview);
        assert!(hints.get().is_some());
    }
}
