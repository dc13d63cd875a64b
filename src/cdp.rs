//! Chrome DevTools Protocol session client.
//!
//! [`CdpClient`] is a persistent WebSocket connection to one browser
//! page. Commands are JSON frames `{id, method, params}` with a
//! monotonically increasing `id` unique within the session; responses
//! carry the same `id` back. A dedicated reader task owns the inbound
//! half of the socket and completes per-command oneshot slots, so many
//! commands can be in flight and each caller wakes on exactly its own
//! response. Frames without an `id` are protocol events; this client
//! logs and discards them.
//!
//! A session whose command timed out or whose transport dropped is
//! *degraded*: [`is_healthy`](CdpClient::is_healthy) turns false and the
//! pool destroys the session on release instead of reusing it.
//!
//! # Example
//!
//! ```rust,no_run
//! use html2pdf_pool::{cdp::CdpClient, PdfOptions};
//!
//! # async fn demo() -> html2pdf_pool::Result<()> {
//! let mut client = CdpClient::connect("ws://127.0.0.1:9222/devtools/page/T1", None, 9222).await?;
//! client.enable_page().await?;
//! client.navigate("file:///tmp/report.html").await?;
//! let pdf = client.print_to_pdf(&PdfOptions::default()).await?;
//! client.close().await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::chrome::launcher::shutdown_child;
use crate::error::{Html2PdfError, Result};
use crate::options::PdfOptions;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// Deadline for a single CDP command round-trip.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for opening the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Static settle time after `Page.navigate` returns.
const LOAD_SETTLE: Duration = Duration::from_secs(3);

/// A CDP session: one WebSocket connection to one page, plus the
/// browser subprocess backing it.
///
/// # Thread safety
///
/// All command methods take `&self`; the outbound sink is serialized
/// behind an async mutex and response correlation is id-based, so a
/// session is safe to share, though the pool hands each session to at
/// most one caller at a time anyway.
pub struct CdpClient {
    sink: tokio::sync::Mutex<WsSink>,
    pending: PendingMap,
    next_id: AtomicU64,
    alive: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    child: Option<Child>,
    port: u16,
}

impl CdpClient {
    /// Connect to a page-level WebSocket endpoint.
    ///
    /// `child` is the browser subprocess backing this page, if the
    /// caller launched one; the client owns it from here on and will
    /// terminate it on [`close`](Self::close) (or kill it on drop).
    /// `port` is the debugging port, kept for logging and accounting.
    ///
    /// # Errors
    ///
    /// Returns [`Html2PdfError::Connection`] if the WebSocket handshake
    /// fails or does not complete within ten seconds.
    pub async fn connect(ws_url: &str, child: Option<Child>, port: u16) -> Result<Self> {
        log::info!("connecting to CDP endpoint: {}", ws_url);

        let (ws, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(ws_url))
            .await
            .map_err(|_| {
                Html2PdfError::connection(format!(
                    "WebSocket connect to {} timed out after {:?}",
                    ws_url, CONNECT_TIMEOUT
                ))
            })?
            .map_err(|e| {
                Html2PdfError::connection_with(format!("WebSocket connect to {} failed", ws_url), e)
            })?;

        let (sink, stream) = ws.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(read_loop(
            stream,
            Arc::clone(&pending),
            Arc::clone(&alive),
        ));

        Ok(Self {
            sink: tokio::sync::Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(1),
            alive,
            reader: Some(reader),
            child,
            port,
        })
    }

    /// The debugging port of the backing browser.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the session is still usable.
    ///
    /// Turns false when the transport drops or a command times out;
    /// the pool destroys unhealthy sessions on release.
    pub fn is_healthy(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Send one CDP command and wait for its response frame.
    ///
    /// The returned value is the whole response object (`result` and/or
    /// `error` still inside); operation wrappers interpret it.
    ///
    /// # Errors
    ///
    /// - [`Html2PdfError::Connection`] if the transport is down or drops mid-wait.
    /// - [`Html2PdfError::CommandTimeout`] after 30 seconds without a response;
    ///   the session is degraded afterwards.
    pub async fn send_command(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if !self.is_healthy() {
            return Err(Html2PdfError::connection(format!(
                "session on port {} is closed or degraded",
                self.port
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending map lock");
            pending.insert(id, tx);
        }

        // Commands always carry a params object, empty or not.
        let frame = json!({
            "id": id,
            "method": method,
            "params": params.unwrap_or_else(|| json!({})),
        });

        log::debug!("sending command {} (id {})", method, id);
        let send_result = {
            let mut sink = self.sink.lock().await;
            sink.send(Message::Text(frame.to_string())).await
        };
        if let Err(e) = send_result {
            self.remove_pending(id);
            self.alive.store(false, Ordering::Release);
            return Err(Html2PdfError::connection_with(
                format!("failed to send {} (id {})", method, id),
                e,
            ));
        }

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => {
                log::debug!("command {} (id {}) completed", method, id);
                Ok(response)
            }
            Ok(Err(_)) => Err(Html2PdfError::connection(format!(
                "connection closed while waiting for {} (id {})",
                method, id
            ))),
            Err(_) => {
                self.remove_pending(id);
                self.alive.store(false, Ordering::Release);
                Err(Html2PdfError::CommandTimeout {
                    method: method.to_string(),
                    id,
                    timeout: COMMAND_TIMEOUT,
                })
            }
        }
    }

    /// Enable the `Page` domain. Required once per session before
    /// navigation; the session factory issues it right after connect.
    pub async fn enable_page(&self) -> Result<()> {
        log::debug!("enabling Page domain");
        self.send_command("Page.enable", None).await?;
        Ok(())
    }

    /// Enable the `Network` domain.
    pub async fn enable_network(&self) -> Result<()> {
        log::debug!("enabling Network domain");
        self.send_command("Network.enable", None).await?;
        Ok(())
    }

    /// Navigate the page to `url` and wait for it to settle.
    ///
    /// Interprets the response the way the protocol delivers trouble: a
    /// top-level `error` fails with [`Html2PdfError::Navigation`], a
    /// non-empty `result.errorText` is only a warning (the page may
    /// still have rendered). Afterwards a fixed three-second settle
    /// gives the load time to complete; no event subscription is used.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        log::info!("navigating to {}", url);
        let response = self
            .send_command("Page.navigate", Some(json!({ "url": url })))
            .await?;

        if let Some(error) = response.get("error") {
            let message = extract_error_message(error);
            log::error!("navigation failed: {}", message);
            return Err(Html2PdfError::Navigation(message));
        }

        if let Some(result) = response.get("result") {
            if let Some(frame_id) = result.get("frameId").and_then(Value::as_str) {
                log::debug!("navigation started, frameId {}", frame_id);
            }
            if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
                if !error_text.is_empty() {
                    log::warn!("navigation reported a load problem: {}", error_text);
                }
            }
        }

        log::debug!("waiting {:?} for the page to settle", LOAD_SETTLE);
        tokio::time::sleep(LOAD_SETTLE).await;
        Ok(())
    }

    /// Print the current page to PDF and return the raw bytes.
    ///
    /// All option fields are sent on every call; the result's base64
    /// `data` field is decoded before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Html2PdfError::PdfGeneration`] on a protocol error, a
    /// missing `result.data` field, or a malformed base64 payload.
    pub async fn print_to_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>> {
        log::info!("requesting PDF generation");
        let response = self
            .send_command("Page.printToPDF", Some(options.to_params()))
            .await?;

        if let Some(error) = response.get("error") {
            let message = extract_error_message(error);
            log::error!("printToPDF returned an error: {}", message);
            return Err(Html2PdfError::PdfGeneration(message));
        }

        let data = response
            .get("result")
            .and_then(|result| result.get("data"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Html2PdfError::PdfGeneration("response carried no result.data field".to_string())
            })?;

        let bytes = BASE64
            .decode(data)
            .map_err(|e| Html2PdfError::PdfGeneration(format!("invalid base64 payload: {}", e)))?;

        log::info!("generated PDF: {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Close the session: fail pending commands, close the transport and
    /// terminate the backing browser.
    ///
    /// Safe to call on an already-degraded session.
    pub async fn close(&mut self) {
        log::debug!("closing CDP session on port {}", self.port);
        self.alive.store(false, Ordering::Release);
        self.fail_pending();

        {
            let mut sink = self.sink.lock().await;
            let _ = sink.send(Message::Close(None)).await;
        }
        if let Some(reader) = self.reader.take() {
            let abort = reader.abort_handle();
            if tokio::time::timeout(Duration::from_secs(2), reader).await.is_err() {
                log::debug!("reader task did not finish in time, aborting");
                abort.abort();
            }
        }
        if let Some(child) = self.child.take() {
            shutdown_child(child).await;
        }
    }

    /// Drop every pending completion slot, waking its waiter with a
    /// connection-closed failure.
    fn fail_pending(&self) {
        let drained: Vec<u64> = {
            let mut pending = self.pending.lock().expect("pending map lock");
            let ids = pending.keys().copied().collect();
            pending.clear();
            ids
        };
        if !drained.is_empty() {
            log::warn!("failing {} pending command(s) on close", drained.len());
        }
    }

    fn remove_pending(&self, id: u64) {
        let mut pending = self.pending.lock().expect("pending map lock");
        pending.remove(&id);
    }
}

impl Drop for CdpClient {
    /// Last-resort cleanup: a session dropped without `close()` must not
    /// leak its reader task or leave a browser process behind.
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(mut child) = self.child.take() {
            log::debug!("killing browser on port {} from drop", self.port);
            let _ = child.start_kill();
        }
    }
}

impl std::fmt::Debug for CdpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpClient")
            .field("port", &self.port)
            .field("healthy", &self.is_healthy())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// The inbound half of the session: parse every frame, complete the
/// matching slot for responses, log events, and fail everything pending
/// once the connection ends.
async fn read_loop(mut stream: WsStream, pending: PendingMap, alive: Arc<AtomicBool>) {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let frame: Value = match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("discarding unparsable frame: {}", e);
                        continue;
                    }
                };

                if let Some(id) = frame.get("id").and_then(Value::as_u64) {
                    let slot = {
                        let mut pending = pending.lock().expect("pending map lock");
                        pending.remove(&id)
                    };
                    match slot {
                        // The waiter may have timed out and abandoned the
                        // slot; dropping the late response is correct.
                        Some(tx) => {
                            let _ = tx.send(frame);
                        }
                        None => log::debug!("response for unknown id {}", id),
                    }
                } else if let Some(method) = frame.get("method").and_then(Value::as_str) {
                    log::debug!("event: {}", method);
                } else {
                    log::debug!("frame with neither id nor method");
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                log::info!("CDP connection closed");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                log::warn!("CDP transport error: {}", e);
                break;
            }
        }
    }

    alive.store(false, Ordering::Release);
    let drained = {
        let mut pending = pending.lock().expect("pending map lock");
        pending.drain().count()
    };
    if drained > 0 {
        log::warn!("connection closed with {} command(s) in flight", drained);
    }
}

/// Pull a human-readable message out of a CDP `error` field.
///
/// The field may be a nested object with `message`, a bare string, or
/// any other JSON value; the original protocol is not consistent here.
pub(crate) fn extract_error_message(error: &Value) -> String {
    match error {
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies the three shapes the error field shows up in.
    #[test]
    fn test_extract_error_message() {
        let object = json!({ "code": -32000, "message": "Cannot navigate" });
        assert_eq!(extract_error_message(&object), "Cannot navigate");

        let object_no_message = json!({ "code": -32601 });
        assert_eq!(extract_error_message(&object_no_message), r#"{"code":-32601}"#);

        let string = json!("plain failure");
        assert_eq!(extract_error_message(&string), "plain failure");

        let number = json!(42);
        assert_eq!(extract_error_message(&number), "42");
    }

    /// Verifies the command deadline constant matches the protocol design.
    #[test]
    fn test_command_timeout_is_30s() {
        assert_eq!(COMMAND_TIMEOUT, Duration::from_secs(30));
    }
}
