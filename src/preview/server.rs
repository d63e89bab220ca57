//! WebSocket Accept Loop for the Preview Bridge
//!
//! Accepted connections are sent to the bridge via channel for the
//! handshake and registration.

use std::net::TcpListener;

use anyhow::Result;

use super::bridge::BridgeCommand;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Start the accept loop that feeds clients to the bridge.
///
/// Returns the actually bound port, which may differ from `base_port`
/// when that one is taken.
pub fn start_bridge_server(
    base_port: u16,
    command_tx: tokio::sync::mpsc::Sender<BridgeCommand>,
) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    std::thread::spawn(move || {
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("bridge"; "client connected: {}", addr);

                    // Set blocking for the WebSocket handshake
                    let _ = stream.set_nonblocking(false);

                    let tx = command_tx.clone();
                    if tx.blocking_send(BridgeCommand::AddClient(stream)).is_err() {
                        crate::log!("bridge"; "failed to send client to bridge");
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                    continue;
                }
                Err(e) => {
                    crate::log!("bridge"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }
    });

    Ok(actual_port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{}", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind bridge server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_retries_past_taken_port() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = taken.local_addr().unwrap().port();

        let (_listener, port) = try_bind_port(base, MAX_PORT_RETRIES).unwrap();
        assert_ne!(port, base);
    }
}
