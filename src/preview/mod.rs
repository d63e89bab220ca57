//! Live Preview Subsystem
//!
//! Message-passing concurrency for the preview sync core:
//!
//! ```text
//! editor frame --ws--> bridge ---Signal::Message------+
//! content dir --notify--> watcher --Signal::EntryChange--> Reconciler
//!                                                          |      |
//!                                       SnapshotStore <--commit   +--Refresh--> bridge --> clients
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Signal and wire message types
//! - `resolve` - Entry resolution policy
//! - `snapshot` - Committed state and content hashing
//! - `reconciler` - Debounced three-channel refetch loop
//! - `bridge` - WebSocket client registry and broadcast
//! - `server` - WebSocket accept loop
//! - `coordinator` - Wires up and runs the tasks

pub mod bridge;
pub mod coordinator;
pub mod messages;
pub mod reconciler;
pub mod resolve;
pub mod server;
pub mod snapshot;

pub use coordinator::Coordinator;
pub use messages::{BridgeMessage, EditorMessage, Signal};
pub use reconciler::Reconciler;
pub use resolve::{ResolvedTarget, resolve_target};
pub use snapshot::{ContentHash, Snapshot, SnapshotStore, hash_value};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::session::{HintStore, MemoryHintStore};

/// State shared between the reconciler, the bridge, and the HTTP thread.
///
/// The snapshot store is written by the reconciler only; everything else
/// reads. The embedded flag flips when an editor client says hello over
/// the bridge.
pub struct PreviewState {
    embedded: AtomicBool,
    pub hints: Arc<dyn HintStore>,
    pub snapshots: SnapshotStore,
}

impl PreviewState {
    pub fn new() -> Self {
        Self {
            embedded: AtomicBool::new(false),
            hints: Arc::new(MemoryHintStore::new()),
            snapshots: SnapshotStore::new(),
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded.load(Ordering::Relaxed)
    }

    pub fn set_embedded(&self, embedded: bool) {
        self.embedded.store(embedded, Ordering::Relaxed);
    }
}

impl Default for PreviewState {
    fn default() -> Self {
        Self::new()
    }
}
