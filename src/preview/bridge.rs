//! Preview Bridge - WebSocket Client Registry and Broadcast
//!
//! The bridge is the editor-facing half of the preview loop:
//!
//! ```text
//! Reconciler --[Refresh]--> Bridge --[broadcast]--> Clients
//!                              ^                       |
//!                              +---[editor messages]---+
//! ```
//!
//! Inbound frames split three ways: a `hello` with the editor role flips
//! the session's embedded flag, pings are answered in place, and
//! everything else is relayed to the reconciler as Channel A traffic.

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::PreviewState;
use super::messages::{BridgeMessage, Signal};

/// Control input for the bridge, as opposed to outbound wire messages.
#[derive(Debug)]
pub enum BridgeCommand {
    /// A freshly accepted TCP connection, pre-handshake.
    AddClient(TcpStream),
    Shutdown,
}

/// A registered WebSocket client.
struct RegisteredClient {
    ws: WebSocket<TcpStream>,
    /// Whether this client said hello as an editor.
    editor: bool,
}

/// What to do with one inbound client text frame.
#[derive(Debug, PartialEq)]
enum ClientFrame {
    Hello { editor: bool },
    Ping { ts: u64 },
    /// Possible editor traffic; the reconciler decides whether it counts.
    Forward(Value),
    Ignored,
}

fn classify_frame(text: &str) -> ClientFrame {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return ClientFrame::Ignored;
    };
    match value.get("type").and_then(|t| t.as_str()) {
        Some("hello") => ClientFrame::Hello {
            editor: value.get("role").and_then(|r| r.as_str()) == Some("editor"),
        },
        Some("ping") => ClientFrame::Ping {
            ts: value.get("ts").and_then(|t| t.as_u64()).unwrap_or(0),
        },
        _ => ClientFrame::Forward(value),
    }
}

/// Preview bridge - manages client connections and broadcasts
pub struct Bridge {
    /// Connection control from the accept loop
    command_rx: mpsc::Receiver<BridgeCommand>,
    /// Wire messages from the reconciler
    outbound_rx: mpsc::Receiver<BridgeMessage>,
    /// Connected clients (shared for broadcast + read threads)
    clients: Arc<Mutex<Vec<RegisteredClient>>>,
    /// Channel A intake on the reconciler
    signal_tx: mpsc::Sender<Signal>,
    state: Arc<PreviewState>,
}

impl Bridge {
    pub fn new(
        command_rx: mpsc::Receiver<BridgeCommand>,
        outbound_rx: mpsc::Receiver<BridgeMessage>,
        signal_tx: mpsc::Sender<Signal>,
        state: Arc<PreviewState>,
    ) -> Self {
        Self {
            command_rx,
            outbound_rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            signal_tx,
            state,
        }
    }

    /// Run the bridge event loop
    pub async fn run(mut self) {
        // Spawn a background thread to poll client messages
        let clients_for_reader = Arc::clone(&self.clients);
        let signal_tx = self.signal_tx.clone();
        let state = Arc::clone(&self.state);
        std::thread::spawn(move || {
            Self::client_reader_loop(clients_for_reader, signal_tx, state);
        });

        loop {
            tokio::select! {
                biased;
                command = self.command_rx.recv() => {
                    match command {
                        Some(BridgeCommand::AddClient(stream)) => self.add_client(stream),
                        Some(BridgeCommand::Shutdown) | None => break,
                    }
                }
                message = self.outbound_rx.recv() => {
                    match message {
                        Some(message) => self.broadcast(&message),
                        None => break,
                    }
                }
            }
        }

        crate::debug!("bridge"; "shutting down");
        let mut clients = self.clients.lock();
        for mut client in clients.drain(..) {
            let _ = client.ws.close(None);
        }
        self.state.set_embedded(false);
    }

    /// Add a new client connection
    fn add_client(&self, stream: TcpStream) {
        // Keep blocking mode during handshake, switch to non-blocking after
        match tungstenite::accept(stream) {
            Ok(mut ws) => {
                let _ = ws.get_ref().set_nonblocking(true);

                let connected = BridgeMessage::connected();
                if let Err(e) = ws.send(Message::Text(connected.to_json().into())) {
                    crate::log!("bridge"; "failed to send connected message: {}", e);
                    return;
                }

                // New clients immediately learn the committed state
                if let Some(snapshot) = self.state.snapshots.current() {
                    let refresh = BridgeMessage::refresh(
                        &snapshot.content_type,
                        snapshot.entry_id.as_deref(),
                        snapshot.version,
                    );
                    if let Err(e) = ws.send(Message::Text(refresh.to_json().into())) {
                        crate::log!("bridge"; "failed to send initial refresh: {}", e);
                    }
                }

                let mut clients = self.clients.lock();
                crate::debug!("bridge"; "client connected (total: {})", clients.len() + 1);
                clients.push(RegisteredClient { ws, editor: false });
            }
            Err(e) => {
                crate::log!("bridge"; "handshake failed: {}", e);
            }
        }
    }

    /// Background thread to read client messages (non-blocking poll)
    fn client_reader_loop(
        clients: Arc<Mutex<Vec<RegisteredClient>>>,
        signal_tx: mpsc::Sender<Signal>,
        state: Arc<PreviewState>,
    ) {
        loop {
            std::thread::sleep(std::time::Duration::from_millis(100));

            let mut clients_guard = clients.lock();
            let mut disconnected = Vec::new();

            for (i, client) in clients_guard.iter_mut().enumerate() {
                match client.ws.read() {
                    Ok(Message::Text(text)) => match classify_frame(&text) {
                        ClientFrame::Hello { editor } => {
                            if editor && !client.editor {
                                client.editor = true;
                                state.set_embedded(true);
                                crate::debug!("bridge"; "editor attached");
                            }
                        }
                        ClientFrame::Ping { ts } => {
                            let pong = BridgeMessage::Pong { ts };
                            let _ = client.ws.send(Message::Text(pong.to_json().into()));
                        }
                        ClientFrame::Forward(value) => {
                            if signal_tx.blocking_send(Signal::Message(value)).is_err() {
                                crate::debug!("bridge"; "reconciler gone, message dropped");
                            }
                        }
                        ClientFrame::Ignored => {
                            crate::debug!("bridge"; "non-json client message ignored");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        disconnected.push(i);
                    }
                    Err(tungstenite::Error::Io(ref e))
                        if e.kind() == std::io::ErrorKind::WouldBlock =>
                    {
                        // No data available, continue
                    }
                    Err(_) => {
                        disconnected.push(i);
                    }
                    _ => {}
                }
            }

            for i in disconnected.into_iter().rev() {
                if clients_guard[i].editor {
                    crate::debug!("bridge"; "editor detached");
                }
                clients_guard.remove(i);
            }

            // The embedded flag tracks whether any editor is still here
            if state.is_embedded() && clients_guard.iter().all(|c| !c.editor) {
                state.set_embedded(false);
            }
        }
    }

    /// Broadcast a message to all connected clients
    fn broadcast(&self, message: &BridgeMessage) {
        let mut clients = self.clients.lock();
        let count = clients.len();

        if count == 0 {
            crate::debug!("bridge"; "no clients connected");
            return;
        }

        let text = message.to_json();
        clients.retain_mut(|client| {
            match client.ws.send(Message::Text(text.clone().into())) {
                Ok(_) => true,
                Err(e) => {
                    crate::debug!("bridge"; "client disconnected: {}", e);
                    false
                }
            }
        });
        crate::debug!("bridge"; "broadcast to {} clients", count);
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
    fn test_classify_editor_hello() {
        let frame = classify_frame(r#"{"type":"hello","role":"editor"}"#);
        assert_eq!(frame, ClientFrame::Hello { editor: true });
    }

    #[test]
    fn test_classify_viewer_hello() {
        let frame = classify_frame(r#"{"type":"hello","role":"viewer"}"#);
        assert_eq!(frame, ClientFrame::Hello { editor: false });

        let frame = classify_frame(r#"{"type":"hello"}"#);
        assert_eq!(frame, ClientFrame::Hello { editor: false });
    }

    #[test]
    fn test_classify_ping() {
        let frame = classify_frame(r#"{"type":"ping","ts":42}"#);
        assert_eq!(frame, ClientFrame::Ping { ts: 42 });

        let frame = classify_frame(r#"{"type":"ping"}"#);
        assert_eq!(frame, ClientFrame::Ping { ts: 0 });
    }

    #[test]
    fn test_classify_forwards_everything_else() {
        let payload = json!({ "type": "entry-change", "entry_uid": "e1" });
        let frame = classify_frame(&payload.to_string());
        assert_eq!(frame, ClientFrame::Forward(payload));

        // Untyped payloads are forwarded too; acceptance is the
        // reconciler's call
        let payload = json!({ "unrelated": true });
        let frame = classify_frame(&payload.to_string());
        assert_eq!(frame, ClientFrame::Forward(payload));
    }

    #[test]
    fn test_classify_rejects_non_json() {
        assert_eq!(classify_frame("not json at all"), ClientFrame::Ignored);
    }
}
