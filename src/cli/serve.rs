//! Development server for the live preview engine.
//!
//! Serves the committed snapshot as JSON and runs the actor system
//! (reconciler, bridge, watcher) on a background runtime:
//!
//! | Endpoint         | Payload                                    |
//! |------------------|--------------------------------------------|
//! | `/snapshot.json` | Mapped view model of the committed entry   |
//! | `/entry.json`    | Normalized entry behind the view model     |
//! | `/healthz`       | Commit counter and embedded flag           |

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use crossbeam::channel::{self, Receiver};
use serde_json::{Value, json};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::config::{Config, cfg};
use crate::log;
use crate::model::PageModel;
use crate::preview::{Coordinator, PreviewState};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Run the preview server (blocking until shutdown).
pub fn run() -> Result<()> {
    let config = cfg();
    let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    crate::core::register_server(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);

    let state = Arc::new(PreviewState::new());
    let actor_handle = spawn_actors(Arc::clone(&config), Arc::clone(&state), shutdown_rx);

    crate::core::set_serving();
    run_request_loop(&server, &state);
    wait_for_shutdown(actor_handle);
    Ok(())
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: std::net::IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < MAX_PORT_RETRIES => continue,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

/// Spawn the actor system on its own runtime thread.
fn spawn_actors(
    config: Arc<Config>,
    state: Arc<PreviewState>,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime");

        rt.block_on(async {
            let coordinator = Coordinator::with_config(config)
                .with_state(state)
                .with_shutdown_signal(shutdown_rx);
            if let Err(e) = coordinator.run().await {
                log!("actor"; "error: {}", e);
            }
        });
    })
}

/// Wait for actor system to shutdown gracefully (max 2 seconds).
fn wait_for_shutdown(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(std::time::Duration::from_millis(50));
    }
}

// ============================================================================
// request handling
// ============================================================================

fn run_request_loop(server: &Server, state: &Arc<PreviewState>) {
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, state) {
            log!("serve"; "request error: {e}");
        }
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, state: &Arc<PreviewState>) -> Result<()> {
    // Early exit if shutdown requested
    if crate::core::is_shutdown() {
        return send_json(request, 503, json!({ "error": "shutting down" }));
    }

    if request.method() != &Method::Get {
        return send_json(request, 405, json!({ "error": "method not allowed" }));
    }

    let path = request.url().split('?').next().unwrap_or_default();
    match path {
        "/snapshot.json" => respond_snapshot(request, state),
        "/entry.json" => respond_entry(request, state),
        "/healthz" => respond_health(request, state),
        _ => send_json(request, 404, json!({ "error": "not found" })),
    }
}

/// Respond with the committed view model.
///
/// Before the first commit this falls back to the content type's empty
/// model so the page always has something to render.
fn respond_snapshot(request: Request, state: &Arc<PreviewState>) -> Result<()> {
    let body = match state.snapshots.current() {
        Some(snapshot) => snapshot.model.to_value(),
        None => {
            let config = cfg();
            PageModel::default_for(&config.site.content_type)
                .map(|model| model.to_value())
                .unwrap_or(Value::Null)
        }
    };
    send_json(request, 200, body)
}

/// Respond with the normalized entry behind the committed snapshot.
fn respond_entry(request: Request, state: &Arc<PreviewState>) -> Result<()> {
    match state.snapshots.current() {
        Some(snapshot) => send_json(request, 200, snapshot.entry.as_value().clone()),
        None => send_json(request, 404, json!({ "error": "no entry committed yet" })),
    }
}

fn respond_health(request: Request, state: &Arc<PreviewState>) -> Result<()> {
    let snapshot = state.snapshots.current();
    let body = json!({
        "serving": crate::core::is_serving(),
        "content_type": cfg().site.content_type,
        "commits": state.snapshots.commit_count(),
        "embedded": state.is_embedded(),
        "entry_id": snapshot.as_ref().and_then(|s| s.entry_id.clone()),
        "hash": snapshot.as_ref().map(|s| s.model_hash.to_string()),
    });
    send_json(request, 200, body)
}

fn send_json(request: Request, status: u16, body: Value) -> Result<()> {
    let config = cfg();
    let body = serde_json::to_vec(&body)?;
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", "application/json"))
        // The page fetches from inside the CMS iframe, a different origin
        .with_header(make_header("Access-Control-Allow-Origin", allow_origin(&config)));
    request.respond(response)?;
    Ok(())
}

/// Origin granted cross-origin access to the endpoints: the configured
/// editor host, or any origin when none is set.
fn allow_origin(config: &Config) -> &str {
    config.site.preview_url.as_deref().unwrap_or("*")
}

fn make_header(key: &'static str, value: &str) -> Header {
    Header::from_bytes(key, value).unwrap()
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_allow_origin_defaults_to_any() {
        assert_eq!(allow_origin(&Config::default()), "*");
    }

    #[test]
    fn test_allow_origin_uses_configured_editor_host() {
        let config = test_parse_config("preview_url = \"https://app.editor.example\"");
        assert_eq!(allow_origin(&config), "https://app.editor.example");
    }
}
