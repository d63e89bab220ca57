//! Preview Coordinator - Wires up the Live Preview Actor System
//!
//! # Responsibility
//!
//! The Coordinator is a **thin orchestrator** that:
//! - Creates communication channels
//! - Wires up actors
//! - Runs them concurrently
//!
//! It does NOT contain sync logic - that lives in `reconciler/`.
//!
//! # Architecture
//!
//! ```text
//! EntryWatcher ──┐
//!                ├──> Reconciler ──> Bridge ──> editor clients
//! Bridge (in) ───┘
//! ```

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::PreviewState;
use super::bridge::{Bridge, BridgeCommand};
use super::messages::{BridgeMessage, Signal};
use super::reconciler::{Reconciler, ReconcilerOptions};
use super::server::start_bridge_server;
use crate::config::Config;
use crate::content::{ContentRepository, EntryWatcher, FileRepository};
use crate::model::ContentSchema;

/// Channel buffer size
const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system
pub struct Coordinator {
    config: Arc<Config>,
    state: Arc<PreviewState>,
    /// Optional shutdown signal receiver
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    /// Create from Arc<Config>
    pub fn with_config(config: Arc<Config>) -> Self {
        Self {
            config,
            state: Arc::new(PreviewState::new()),
            shutdown_rx: None,
        }
    }

    /// Share preview state with the HTTP server
    pub fn with_state(mut self, state: Arc<PreviewState>) -> Self {
        self.state = state;
        self
    }

    /// Set shutdown signal receiver
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system
    pub async fn run(mut self) -> Result<()> {
        // Create channels
        let (signal_tx, signal_rx) = mpsc::channel::<Signal>(CHANNEL_BUFFER);
        let (command_tx, command_rx) = mpsc::channel::<BridgeCommand>(CHANNEL_BUFFER);
        let (bridge_tx, bridge_rx) = mpsc::channel::<BridgeMessage>(CHANNEL_BUFFER);

        // Start bridge WebSocket server
        match start_bridge_server(self.config.serve.bridge_port(), command_tx.clone()) {
            Ok(port) => {
                crate::log!("bridge"; "ws://{}:{}", self.config.serve.interface, port);
            }
            Err(e) => {
                crate::log!("actor"; "bridge server failed: {}", e);
            }
        }

        let schema = ContentSchema::for_content_type(&self.config.site.content_type)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no view model registered for content type '{}'",
                    self.config.site.content_type
                )
            })?;

        let repo: Arc<dyn ContentRepository> =
            Arc::new(FileRepository::new(&self.config.repository.content_dir));

        // Watcher feeds change signals to the reconciler
        let watcher = if self.config.repository.watch {
            let watcher = EntryWatcher::new(
                self.config.repository.content_dir.clone(),
                self.config.site.locale.clone(),
                signal_tx.clone(),
            )
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
            Some(watcher)
        } else {
            None
        };

        let options = ReconcilerOptions {
            locale: self.config.site.locale.clone(),
            preview_enabled: self.config.preview.enabled,
            edit_attribute: self.config.preview.edit_attribute.clone(),
            message_window: self.config.preview.message_window(),
            push_window: self.config.preview.push_window(),
            poll_interval: self.config.preview.poll_interval(),
            quiet_window: self.config.preview.quiet_window(),
        };

        let reconciler = Reconciler::new(
            repo,
            schema,
            options,
            Arc::clone(&self.state),
            signal_rx,
            bridge_tx,
        );
        let bridge = Bridge::new(
            command_rx,
            bridge_rx,
            signal_tx.clone(),
            Arc::clone(&self.state),
        );

        // Run actors until shutdown signal
        crate::debug!("actor"; "start");
        let shutdown_rx = self.shutdown_rx.take();
        let _ = run_actors(
            reconciler,
            bridge,
            watcher,
            signal_tx,
            command_tx,
            shutdown_rx,
        )
        .await;

        crate::debug!("actor"; "stopped");
        Ok(())
    }
}

/// Run all actors concurrently
async fn run_actors(
    reconciler: Reconciler,
    bridge: Bridge,
    watcher: Option<EntryWatcher>,
    signal_tx: mpsc::Sender<Signal>,
    command_tx: mpsc::Sender<BridgeCommand>,
    shutdown_rx: Option<Receiver<()>>,
) -> Result<()> {
    // Spawn the reconciler and keep its handle so we can wait for it to finish
    let reconciler_handle = tokio::spawn(async move { reconciler.run().await });

    // Spawn other actors
    let bridge_handle = tokio::spawn(async move { bridge.run().await });
    if let Some(watcher) = watcher {
        tokio::spawn(async move { watcher.run().await });
    }

    // Wait for shutdown signal (poll-based since std::sync::mpsc)
    if let Some(rx) = shutdown_rx {
        loop {
            // Check for shutdown signal
            if rx.try_recv().is_ok() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            // Small sleep to avoid busy-waiting
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    } else {
        // No shutdown channel, run until the bridge stops on its own
        let _ = bridge_handle.await;
    }

    // Stop both actors, reconciler last so an in-flight cycle can finish
    let _ = command_tx.send(BridgeCommand::Shutdown).await;
    let _ = signal_tx.send(Signal::Shutdown).await;

    // Wait for the reconciler to drain
    let _ = tokio::time::timeout(std::time::Duration::from_millis(500), reconciler_handle).await;

    Ok(())
}
