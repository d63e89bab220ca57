//! Update Reconciler - Debounced Three-Channel Refetch Loop
//!
//! Owns the process-wide "is there a fresher entry available" question:
//!
//! ```text
//! Channel A: editor messages ---+                     +--> SnapshotStore
//! Channel B: entry changes  ----+--> resolve -> fetch -> normalize
//! Channel C: poll timer     ----+    -> annotate -> map -> diff -> commit
//! ```
//!
//! Channels A and B each own a restartable debounce timer; a new signal
//! restarts its own channel's window and nobody else's. Channel C fires
//! at a fixed interval but backs off while A/B are active. No ordering
//! is assumed between channels: change detection over content hashes is
//! the backstop that makes duplicate and out-of-order signals harmless.


use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::content::{ContentRepository, EntryQuery, RawEntry};
use crate::edit::{EditSession, annotate};
use crate::entry::normalize;
use crate::model::ContentSchema;
use crate::session::{PageContext, StoredHint};

use super::PreviewState;
use super::messages::{BridgeMessage, EditorMessage, Signal};
use super::resolve::{ResolvedTarget, resolve_target};
use super::snapshot::Snapshot;

// =============================================================================
// Options
// =============================================================================

/// Session options for the reconciler, lifted out of `[site]` and
/// `[preview]` config.
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    pub locale: String,
    pub preview_enabled: bool,
    pub edit_attribute: String,
    /// Channel A debounce window.
    pub message_window: Duration,
    /// Channel B debounce window.
    pub push_window: Duration,
    /// Channel C interval.
    pub poll_interval: Duration,
    /// How long after an A/B commit the poll stays quiet.
    pub quiet_window: Duration,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            locale: "en-us".to_string(),
            preview_enabled: true,
            edit_attribute: crate::edit::DEFAULT_EDIT_ATTRIBUTE.to_string(),
            message_window: Duration::from_millis(400),
            push_window: Duration::from_millis(300),
            poll_interval: Duration::from_millis(5000),
            quiet_window: Duration::from_millis(5000),
        }
    }
}

// =============================================================================
// Cycle bookkeeping
// =============================================================================

/// What started a reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CycleTrigger {
    Startup,
    /// Channel A. Refetch keyed to the stored hint, not the message.
    Message,
    /// Channel B. Refetch keyed to the id the push carried.
    Push { entry_id: String },
    Poll,
}

impl CycleTrigger {
    fn label(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Message => "message",
            Self::Push { .. } => "push",
            Self::Poll => "poll",
        }
    }
}

/// How a reconciliation cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    /// Fresh content replaced the committed snapshot.
    Committed,
    /// Fetched content hashes equal to the committed snapshot.
    Unchanged,
    /// Nothing renderable came back; previous state stays.
    Empty,
    /// Fetch failed; previous state stays.
    Aborted,
}

// =============================================================================
// Channel timers
// =============================================================================

/// Per-channel debounce state, centralized as named fields.
///
/// `last_commit` is the one piece of cross-channel shared state: when a
/// message- or push-triggered cycle last committed. The poll inspects it
/// to back off.
struct ChannelTimers {
    message_window: Duration,
    push_window: Duration,
    quiet_window: Duration,
    /// Channel A: arrival of the newest accepted editor message.
    last_message: Option<Instant>,
    /// Channel B: arrival of the newest entry-change signal.
    last_push: Option<Instant>,
    /// The entry id the newest push carried. Last one wins.
    push_entry: Option<String>,
    last_commit: Option<Instant>,
}

impl ChannelTimers {
    fn new(options: &ReconcilerOptions) -> Self {
        Self {
            message_window: options.message_window,
            push_window: options.push_window,
            quiet_window: options.quiet_window,
            last_message: None,
            last_push: None,
            push_entry: None,
            last_commit: None,
        }
    }

    fn note_message(&mut self) {
        self.last_message = Some(Instant::now());
    }

    fn note_push(&mut self, entry_id: String) {
        self.last_push = Some(Instant::now());
        self.push_entry = Some(entry_id);
    }

    fn note_commit(&mut self) {
        self.last_commit = Some(Instant::now());
    }

    /// Channel A fires once its window has been quiet for the full
    /// debounce duration.
    fn take_message_if_ready(&mut self) -> bool {
        match self.last_message {
            Some(at) if at.elapsed() >= self.message_window => {
                self.last_message = None;
                true
            }
            _ => false,
        }
    }

    fn take_push_if_ready(&mut self) -> Option<String> {
        match self.last_push {
            Some(at) if at.elapsed() >= self.push_window => {
                self.last_push = None;
                self.push_entry.take()
            }
            _ => None,
        }
    }

    /// The poll no-ops while a channel window is open or an A/B commit is
    /// fresher than the quiet window.
    fn poll_suppressed(&self) -> bool {
        if self.last_message.is_some() || self.last_push.is_some() {
            return true;
        }
        matches!(self.last_commit, Some(at) if at.elapsed() < self.quiet_window)
    }

    /// Precise sleep until the next window can close.
    fn sleep_duration(&self) -> Duration {
        let message_remaining = self
            .last_message
            .map(|at| self.message_window.saturating_sub(at.elapsed()));
        let push_remaining = self
            .last_push
            .map(|at| self.push_window.saturating_sub(at.elapsed()));

        match (message_remaining, push_remaining) {
            (Some(a), Some(b)) => a.min(b).max(Duration::from_millis(1)),
            (Some(a), None) => a.max(Duration::from_millis(1)),
            (None, Some(b)) => b.max(Duration::from_millis(1)),
            (None, None) => Duration::from_secs(86400),
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

pub struct Reconciler {
    repo: Arc<dyn ContentRepository>,
    schema: &'static ContentSchema,
    options: ReconcilerOptions,
    state: Arc<PreviewState>,
    signal_rx: mpsc::Receiver<Signal>,
    bridge_tx: mpsc::Sender<BridgeMessage>,
    timers: ChannelTimers,
}

impl Reconciler {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        schema: &'static ContentSchema,
        options: ReconcilerOptions,
        state: Arc<PreviewState>,
        signal_rx: mpsc::Receiver<Signal>,
        bridge_tx: mpsc::Sender<BridgeMessage>,
    ) -> Self {
        let timers = ChannelTimers::new(&options);
        Self {
            repo,
            schema,
            options,
            state,
            signal_rx,
            bridge_tx,
            timers,
        }
    }

    /// Run until the signal channel closes or a shutdown signal arrives.
    pub async fn run(mut self) {
        crate::debug!("preview"; "reconciler start ({})", self.schema.content_type);
        self.run_cycle(CycleTrigger::Startup).await;

        let mut poll = tokio::time::interval_at(
            Instant::now() + self.options.poll_interval,
            self.options.poll_interval,
        );
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                signal = self.signal_rx.recv() => {
                    match signal {
                        Some(Signal::Message(payload)) => self.note_editor_message(&payload),
                        Some(Signal::EntryChange { content_type, entry_id }) => {
                            self.note_entry_change(content_type, entry_id);
                        }
                        Some(Signal::Shutdown) | None => break,
                    }
                }
                _ = tokio::time::sleep(self.timers.sleep_duration()) => {
                    self.flush_ready().await;
                }
                _ = poll.tick() => {
                    self.poll_tick().await;
                }
            }
        }
        crate::debug!("preview"; "reconciler stopped");
    }

    /// Channel A intake. Only payloads that parse as editor traffic
    /// restart the window; everything else is ignored.
    fn note_editor_message(&mut self, payload: &serde_json::Value) {
        match EditorMessage::parse(payload) {
            Some(message) => {
                crate::debug!(
                    "preview";
                    "editor message ({})",
                    message.entry_id.as_deref().unwrap_or("untagged")
                );
                self.timers.note_message();
            }
            None => crate::debug!("preview"; "non-editor message ignored"),
        }
    }

    /// Channel B intake. Changes outside the page's content type never
    /// schedule a cycle.
    fn note_entry_change(&mut self, content_type: String, entry_id: String) {
        if content_type != self.schema.content_type {
            crate::debug!("preview"; "change in {}/{} ignored", content_type, entry_id);
            return;
        }
        crate::debug!("preview"; "entry change: {}", entry_id);
        self.timers.note_push(entry_id);
    }

    /// Fire whichever channel windows have closed. Both may fire on the
    /// same wakeup; change detection makes the second cycle a no-op when
    /// they saw the same edit.
    async fn flush_ready(&mut self) {
        if self.timers.take_message_if_ready() {
            let outcome = self.run_cycle(CycleTrigger::Message).await;
            if outcome == CycleOutcome::Committed {
                self.timers.note_commit();
            }
        }
        if let Some(entry_id) = self.timers.take_push_if_ready() {
            let outcome = self.run_cycle(CycleTrigger::Push { entry_id }).await;
            if outcome == CycleOutcome::Committed {
                self.timers.note_commit();
            }
        }
    }

    async fn poll_tick(&mut self) {
        if self.timers.poll_suppressed() {
            crate::debug!("preview"; "poll suppressed");
            return;
        }
        self.run_cycle(CycleTrigger::Poll).await;
    }

    /// One reconciliation cycle: resolve, fetch, normalize, annotate,
    /// map, diff, commit.
    async fn run_cycle(&mut self, trigger: CycleTrigger) -> CycleOutcome {
        let explicit = match &trigger {
            CycleTrigger::Push { entry_id } => Some(entry_id.clone()),
            CycleTrigger::Message => self.state.hints.get().map(|h| h.entry_id),
            CycleTrigger::Startup | CycleTrigger::Poll => None,
        };
        let ctx = self.page_context();
        let target = resolve_target(
            self.schema.content_type,
            explicit.as_deref(),
            &ctx,
            self.state.hints.as_ref(),
            self.options.preview_enabled,
        );
        crate::debug!(
            "preview";
            "{} cycle: {}#{}",
            trigger.label(),
            target.content_type,
            target.entry_id.as_deref().unwrap_or("latest")
        );

        let raw = match self.fetch_with_recovery(&target).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                crate::debug!("preview"; "no content for {}", target.content_type);
                return CycleOutcome::Empty;
            }
            Err(()) => return CycleOutcome::Aborted,
        };

        let mut entry = normalize(&raw, &self.schema.group_keys());
        let session = EditSession::detect(
            &ctx,
            self.state.hints.as_ref(),
            self.options.preview_enabled,
            &self.options.edit_attribute,
        );
        if target.mode.is_preview() && session.is_active() {
            annotate(&mut entry, self.schema, &self.options.locale);
        }

        let Some(model) = (self.schema.map)(&entry) else {
            crate::debug!("preview"; "{} has no renderable content", target.content_type);
            return CycleOutcome::Empty;
        };

        let snapshot = Snapshot::build(entry, model, self.schema.content_type, target.mode);

        if let Some(current) = self.state.snapshots.current()
            && current.same_content(&snapshot)
        {
            crate::logger::status_unchanged(&format!(
                "{} unchanged ({})",
                target.content_type, snapshot.model_hash
            ));
            return CycleOutcome::Unchanged;
        }

        // Session bookkeeping belongs to preview cycles only; a stored id
        // from a production fetch would later read as an editing signal.
        if target.mode.is_preview()
            && let Some(id) = &snapshot.entry_id
        {
            self.state.hints.set(StoredHint {
                entry_id: id.clone(),
                version: snapshot.version,
                updated_at: snapshot.updated_at.clone(),
            });
        }

        let refresh = BridgeMessage::refresh(
            &snapshot.content_type,
            snapshot.entry_id.as_deref(),
            snapshot.version,
        );
        let label = snapshot
            .entry_id
            .clone()
            .unwrap_or_else(|| "latest".to_string());
        let hash = snapshot.model_hash;
        let ordinal = self.state.snapshots.commit(snapshot);
        let _ = self.bridge_tx.send(refresh).await;

        crate::logger::status_success(&format!(
            "{} {} committed ({hash})",
            target.content_type, label
        ));
        crate::debug!("preview"; "commit #{}", ordinal);
        CycleOutcome::Committed
    }

    /// Fetch the resolved entry. The one recovery rule: a stored id that
    /// no longer resolves purges the hint and retries once for the
    /// collection's latest. Anything else fails the cycle and leaves the
    /// committed state alone.
    async fn fetch_with_recovery(
        &self,
        target: &ResolvedTarget,
    ) -> Result<Option<RawEntry>, ()> {
        let query = match target.entry_id.as_deref() {
            Some(id) => EntryQuery::by_id(id, &self.options.locale, target.mode),
            None => EntryQuery::latest(&self.options.locale, target.mode),
        };

        match self.repo.fetch_entry(&target.content_type, &query).await {
            Ok(found) => Ok(found),
            Err(err) if err.is_not_found() => {
                crate::debug!("preview"; "{}, purging stored hint", err);
                self.state.hints.clear();
                let retry = EntryQuery::latest(&self.options.locale, target.mode);
                match self.repo.fetch_entry(&target.content_type, &retry).await {
                    Ok(found) => Ok(found),
                    Err(retry_err) => {
                        crate::logger::status_error(
                            &format!("refresh failed: {}", target.content_type),
                            &retry_err.to_string(),
                        );
                        Err(())
                    }
                }
            }
            Err(err) => {
                crate::logger::status_error(
                    &format!("refresh failed: {}", target.content_type),
                    &err.to_string(),
                );
                Err(())
            }
        }
    }

    /// The reconciler's page context: no URL to look at, embeddedness
    /// straight from the bridge flag.
    fn page_context(&self) -> PageContext {
        PageContext {
            embedded: self.state.is_embedded(),
            ..PageContext::default()
        }
    }
}
