//! Shared test support: an in-process stub CDP server.
//!
//! The stub accepts WebSocket connections and speaks just enough CDP
//! for the pool and facade to run end-to-end without Chrome: it answers
//! `Page.navigate` with a frame id, `Page.printToPDF` with a base64
//! `%PDF` payload, and everything else with an empty result. Received
//! command ids are recorded for protocol assertions.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use html2pdf_pool::cdp::CdpClient;
use html2pdf_pool::{Result, SessionFactory};

/// The canned PDF payload the stub serves, starting with the `%PDF`
/// signature like the real thing.
pub const STUB_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";

/// An in-process WebSocket server answering CDP commands.
pub struct StubCdpServer {
    addr: SocketAddr,
    received_ids: Arc<Mutex<Vec<u64>>>,
    connections: Arc<AtomicUsize>,
    accept_task: JoinHandle<()>,
}

impl StubCdpServer {
    /// Bind an ephemeral port and start accepting connections.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub server addr");
        let received_ids = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let ids = Arc::clone(&received_ids);
        let conns = Arc::clone(&connections);
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                conns.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle_connection(stream, Arc::clone(&ids)));
            }
        });

        Self {
            addr,
            received_ids,
            connections,
            accept_task,
        }
    }

    /// A page-style WebSocket URL pointing at this server.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/devtools/page/stub", self.addr)
    }

    /// Every command id received so far, in arrival order.
    pub fn received_ids(&self) -> Vec<u64> {
        self.received_ids.lock().unwrap().clone()
    }

    /// How many connections were ever accepted.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for StubCdpServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn handle_connection(stream: TcpStream, ids: Arc<Mutex<Vec<u64>>>) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut sink, mut stream) = ws.split();

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                let Some(id) = frame.get("id").and_then(Value::as_u64) else {
                    continue;
                };
                ids.lock().unwrap().push(id);

                let method = frame.get("method").and_then(Value::as_str).unwrap_or("");
                let response = match method {
                    "Page.navigate" => {
                        json!({ "id": id, "result": { "frameId": "stub-frame" } })
                    }
                    "Page.printToPDF" => {
                        json!({ "id": id, "result": { "data": BASE64.encode(STUB_PDF) } })
                    }
                    _ => json!({ "id": id, "result": {} }),
                };
                if sink
                    .send(Message::Text(response.to_string()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        }
    }
}

/// A session factory producing real [`CdpClient`]s connected to a stub
/// server instead of launching browsers.
pub struct StubSessionFactory {
    ws_url: String,
}

impl StubSessionFactory {
    pub fn new(server: &StubCdpServer) -> Self {
        Self {
            ws_url: server.ws_url(),
        }
    }
}

#[async_trait]
impl SessionFactory for StubSessionFactory {
    async fn create(&self, port: u16) -> Result<CdpClient> {
        let client = CdpClient::connect(&self.ws_url, None, port).await?;
        client.enable_page().await?;
        Ok(client)
    }
}
