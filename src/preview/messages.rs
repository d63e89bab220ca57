//! Preview actor messages and the bridge wire protocol.
//!
//! Three kinds of message live here:
//!
//! - [`Signal`]: input to the reconciler, one variant per update channel
//! - [`EditorMessage`]: the lenient reading of a cross-window editor
//!   payload, deciding whether a frame counts as an update signal at all
//! - [`BridgeMessage`]: the typed JSON protocol the bridge speaks to
//!   connected clients

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message payload keys that may carry an entry id.
const ENTRY_ID_KEYS: &[&str] = &["entry_uid", "entry_id", "entryId"];

/// Type/event tags that mark a payload as editor traffic even without an
/// entry id.
const EDITOR_EVENT_TAGS: &[&str] = &["entry-change", "content-update", "live-preview"];

// =============================================================================
// Reconciler input
// =============================================================================

/// Input to the reconciler, one variant per update channel.
#[derive(Debug, Clone)]
pub enum Signal {
    /// Channel A: a loosely-typed editor payload relayed by the bridge.
    Message(Value),
    /// Channel B: a typed entry-change event.
    EntryChange {
        content_type: String,
        entry_id: String,
    },
    /// Stop the reconciler loop.
    Shutdown,
}

// =============================================================================
// Editor payload acceptance
// =============================================================================

/// The parts of an editor payload worth keeping.
///
/// Cross-window messages arrive from arbitrary senders; only payloads
/// that either carry a recognized event tag or name an entry id count as
/// update signals. The entry id is informational only: refetches key off
/// the session's stored hint, never off an untrusted frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorMessage {
    pub entry_id: Option<String>,
    pub content_type: Option<String>,
}

impl EditorMessage {
    /// Accept or reject a raw payload. `None` means "not editor traffic,
    /// ignore it" and must never be an error.
    pub fn parse(payload: &Value) -> Option<Self> {
        let object = payload.as_object()?;

        let tagged = ["type", "event"].iter().any(|key| {
            object
                .get(*key)
                .and_then(Value::as_str)
                .is_some_and(|tag| EDITOR_EVENT_TAGS.contains(&tag))
        });
        let entry_id = find_entry_id(object);

        if !tagged && entry_id.is_none() {
            return None;
        }

        Some(Self {
            entry_id,
            content_type: find_str(
                object,
                &["content_type_uid", "content_type", "contentTypeUid"],
            ),
        })
    }
}

fn find_str(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Entry id at the top level, or nested one level under `data`.
fn find_entry_id(object: &Map<String, Value>) -> Option<String> {
    find_str(object, ENTRY_ID_KEYS).or_else(|| {
        object
            .get("data")
            .and_then(Value::as_object)
            .and_then(|data| find_str(data, ENTRY_ID_KEYS))
    })
}

// =============================================================================
// Bridge protocol
// =============================================================================

/// Bridge message sent over WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BridgeMessage {
    /// Connection established
    Connected {
        /// Server version for compatibility check
        version: String,
    },

    /// A new snapshot was committed; clients should refetch
    Refresh {
        content_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        entry_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<u64>,
    },

    /// Keep-alive ping (server → client)
    Ping {
        /// Timestamp for latency measurement
        ts: u64,
    },

    /// Keep-alive pong (client → server)
    Pong {
        /// Echo back the timestamp
        ts: u64,
    },
}

impl BridgeMessage {
    /// Create a connected message
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create a refresh message for a committed snapshot
    pub fn refresh(content_type: &str, entry_id: Option<&str>, version: Option<u64>) -> Self {
        Self::Refresh {
            content_type: content_type.to_string(),
            entry_id: entry_id.map(str::to_string),
            version,
        }
    }

    /// Create a ping message
    pub fn ping() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::Ping { ts }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"ping","ts":0}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
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
    fn test_refresh_serialization() {
        let msg = BridgeMessage::refresh("homepage", Some("blt42"), Some(7));
        let json = msg.to_json();
        assert!(json.contains(r#""type":"refresh""#));
        assert!(json.contains(r#""content_type":"homepage""#));
        assert!(json.contains(r#""entry_id":"blt42""#));

        let parsed = BridgeMessage::from_json(&json).unwrap();
        match parsed {
            BridgeMessage::Refresh {
                content_type,
                entry_id,
                version,
            } => {
                assert_eq!(content_type, "homepage");
                assert_eq!(entry_id.as_deref(), Some("blt42"));
                assert_eq!(version, Some(7));
            }
            _ => panic!("Expected Refresh message"),
        }
    }

    #[test]
    fn test_refresh_omits_absent_fields() {
        let json = BridgeMessage::refresh("homepage", None, None).to_json();
        assert!(!json.contains("entry_id"));
        assert!(!json.contains("version"));
    }

    #[test]
    fn test_connected_carries_version() {
        let json = BridgeMessage::connected().to_json();
        assert!(json.contains(r#""type":"connected""#));
        assert!(json.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_editor_message_by_event_tag() {
        let msg = EditorMessage::parse(&json!({ "type": "entry-change" })).unwrap();
        assert_eq!(msg.entry_id, None);

        let msg = EditorMessage::parse(&json!({ "event": "content-update" })).unwrap();
        assert_eq!(msg.entry_id, None);
    }

    #[test]
    fn test_editor_message_by_entry_id() {
        let msg = EditorMessage::parse(&json!({ "entry_uid": "blt7" })).unwrap();
        assert_eq!(msg.entry_id.as_deref(), Some("blt7"));

        let msg = EditorMessage::parse(&json!({
            "type": "live-preview",
            "data": { "entryId": "blt8", "content_type_uid": "homepage" },
        }))
        .unwrap();
        assert_eq!(msg.entry_id.as_deref(), Some("blt8"));
        assert_eq!(msg.content_type.as_deref(), Some("homepage"));
    }

    #[test]
    fn test_unrelated_payloads_rejected() {
        assert_eq!(EditorMessage::parse(&json!({ "type": "analytics" })), None);
        assert_eq!(EditorMessage::parse(&json!({})), None);
        assert_eq!(EditorMessage::parse(&json!("just a string")), None);
        assert_eq!(EditorMessage::parse(&json!(42)), None);
        assert_eq!(EditorMessage::parse(&json!(null)), None);
    }

    #[test]
    fn test_empty_entry_id_does_not_qualify() {
        assert_eq!(EditorMessage::parse(&json!({ "entry_uid": "" })), None);
    }
}
