//! Configuration section definitions.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// [site]
// ============================================================================

/// Site metadata and the page it renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Site title, shown in status output
    pub title: String,

    /// Locale the site is served in
    pub locale: String,

    /// Content type backing the page
    pub content_type: String,

    /// Editor host origin allowed to call the preview endpoints, if any
    pub preview_url: Option<String>,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: String::new(),
            locale: "en-us".to_string(),
            content_type: "homepage".to_string(),
            preview_url: None,
        }
    }
}

// ============================================================================
// [repository]
// ============================================================================

/// Where content lives and whether to watch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySection {
    /// Content directory (relative to project root)
    pub content_dir: PathBuf,

    /// Watch the content directory for changes
    pub watch: bool,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            watch: true,
        }
    }
}

// ============================================================================
// [preview]
// ============================================================================

/// Live preview behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSection {
    /// Master switch for preview fetching and edit markers
    pub enabled: bool,

    /// HTML attribute edit markers render into
    pub edit_attribute: String,

    /// Debounce window for cross-window editor messages
    pub message_debounce_ms: u64,

    /// Debounce window for entry-change push signals
    pub push_debounce_ms: u64,

    /// Polling fallback interval
    pub poll_interval_ms: u64,

    /// How long after a push-driven commit the poll stays quiet
    pub push_quiet_ms: u64,
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self {
            enabled: true,
            edit_attribute: crate::edit::DEFAULT_EDIT_ATTRIBUTE.to_string(),
            message_debounce_ms: 400,
            push_debounce_ms: 300,
            poll_interval_ms: 5000,
            push_quiet_ms: 5000,
        }
    }
}

impl PreviewSection {
    pub fn message_window(&self) -> Duration {
        Duration::from_millis(self.message_debounce_ms)
    }

    pub fn push_window(&self) -> Duration {
        Duration::from_millis(self.push_debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.push_quiet_ms)
    }
}

// ============================================================================
// [serve]
// ============================================================================

/// Development server settings. The bridge listens on the next port up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeSection {
    /// Network interface to bind
    pub interface: IpAddr,

    /// Port for the HTTP endpoints
    pub port: u16,
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4600,
        }
    }
}

impl ServeSection {
    /// The bridge WebSocket port derived from the HTTP port.
    pub fn bridge_port(&self) -> u16 {
        self.port.saturating_add(1)
    }
}
