//! Headless Chrome launching and page-endpoint discovery.
//!
//! One launcher invocation produces one browser process bound to one
//! remote-debugging port, plus the WebSocket URL of a *page-level* CDP
//! endpoint inside it. The sequence is:
//!
//! 1. Allocate a free TCP port, starting at the requested port and
//!    probing up to 100 ports past it.
//! 2. Spawn the browser with the debugging flag set, stderr and stdout
//!    both captured (Chrome prints the DevTools line on stderr).
//! 3. Scrape the combined output for `DevTools listening on ws://...`,
//!    capped at 100 lines, watching for the bind-error marker that
//!    signals the probe lost the race for the port.
//! 4. Give the HTTP discovery endpoint a second to come up.
//! 5. `GET /json/list`, pick the first `"page"` target; if there is
//!    none, `GET /json/new` to open a tab.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::error::{Html2PdfError, Result};

/// Maximum startup-output lines to inspect before giving up.
const STARTUP_LINE_CAP: usize = 100;
/// How many ports past the requested one the allocator probes.
const PORT_PROBE_RANGE: u16 = 100;
/// Delay between the DevTools log line and HTTP discovery.
const DISCOVERY_GRACE: Duration = Duration::from_secs(1);
/// How long a closing browser gets before being killed.
const CLOSE_GRACE: Duration = Duration::from_secs(5);
/// Marker Chrome prints when the debugging port is already bound.
const BIND_ERROR_MARKER: &str = "bind() returned an error";

/// One tab entry from the `/json/list` and `/json/new` endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabInfo {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    web_socket_debugger_url: Option<String>,
}

/// A launched headless browser and its page-level CDP endpoint.
///
/// Owns the subprocess until [`into_parts`](Self::into_parts) hands it
/// over (normally to the CDP session) or [`close`](Self::close) tears
/// it down.
pub struct ChromeLauncher {
    child: Option<Child>,
    port: u16,
    page_ws_url: String,
}

impl ChromeLauncher {
    /// Launch a headless browser on (or near) `requested_port`.
    ///
    /// # Errors
    ///
    /// - [`Html2PdfError::PortUnavailable`] if no port in the probe range is free.
    /// - [`Html2PdfError::PortConflict`] if the child hit a bind error anyway.
    /// - [`Html2PdfError::LaunchUnconfirmed`] if the DevTools line never appeared.
    /// - [`Html2PdfError::Connection`] for spawn and discovery failures.
    pub async fn launch(chrome_path: &Path, requested_port: u16) -> Result<Self> {
        let port = allocate_port(requested_port).await?;
        if port != requested_port {
            log::warn!(
                "port {} is occupied, using {} instead",
                requested_port,
                port
            );
        }

        log::info!(
            "launching Chrome: {} (debugging port {})",
            chrome_path.display(),
            port
        );

        let mut child = Command::new(chrome_path)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-web-security")
            .arg("--allow-file-access-from-files")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg(format!("--remote-debugging-port={}", port))
            .arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Html2PdfError::connection_with(
                    format!("failed to spawn Chrome at {}", chrome_path.display()),
                    e,
                )
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        match wait_for_devtools_line(stdout, stderr).await {
            Ok(ws_url) => {
                log::debug!("browser-level DevTools endpoint: {}", ws_url);
            }
            Err(e) => {
                // The child is useless without a confirmed debugger; make
                // sure it does not linger.
                let _ = child.start_kill();
                return Err(e);
            }
        }

        // The HTTP endpoint lags the log line slightly.
        tokio::time::sleep(DISCOVERY_GRACE).await;

        let page_ws_url = match discover_page_endpoint(port).await {
            Ok(url) => url,
            Err(e) => {
                let _ = child.start_kill();
                return Err(e);
            }
        };
        log::info!("page-level CDP endpoint: {}", page_ws_url);

        Ok(Self {
            child: Some(child),
            port,
            page_ws_url,
        })
    }

    /// The debugging port actually bound.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The page-level WebSocket endpoint URL.
    pub fn page_ws_url(&self) -> &str {
        &self.page_ws_url
    }

    /// Hand over the subprocess, port and endpoint, consuming the launcher.
    pub fn into_parts(mut self) -> (Child, u16, String) {
        let child = self.child.take().expect("launcher already dismantled");
        (child, self.port, std::mem::take(&mut self.page_ws_url))
    }

    /// Terminate the browser: ask politely, wait up to five seconds,
    /// then kill.
    pub async fn close(&mut self) {
        if let Some(child) = self.child.take() {
            shutdown_child(child).await;
        }
    }
}

impl Drop for ChromeLauncher {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            log::debug!("launcher dropped with live browser, killing pid {:?}", child.id());
            let _ = child.start_kill();
        }
    }
}

/// Gracefully terminate a browser subprocess.
///
/// Sends SIGTERM on unix so Chrome can tear down its children, waits up
/// to [`CLOSE_GRACE`], then force-kills.
pub(crate) async fn shutdown_child(mut child: Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain kill(2) on a pid we own.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        match tokio::time::timeout(CLOSE_GRACE, child.wait()).await {
            Ok(_) => return,
            Err(_) => log::warn!("browser did not exit within {:?}, killing", CLOSE_GRACE),
        }
    }

    let _ = child.start_kill();
    let _ = tokio::time::timeout(CLOSE_GRACE, child.wait()).await;
}

/// Find a free TCP port at `requested` or in the probe range above it.
///
/// Bind-and-release is inherently racy against the later spawn; the
/// launcher compensates by watching the child's output for the bind
/// error marker.
async fn allocate_port(requested: u16) -> Result<u16> {
    for offset in 0..=PORT_PROBE_RANGE {
        let Some(port) = requested.checked_add(offset) else {
            break;
        };
        match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => {
                drop(listener);
                return Ok(port);
            }
            Err(_) => continue,
        }
    }
    Err(Html2PdfError::PortUnavailable(format!(
        "ports {}..={} are all occupied",
        requested,
        requested.saturating_add(PORT_PROBE_RANGE)
    )))
}

/// Read the child's combined output until the DevTools listening line
/// appears, returning the browser-level WebSocket URL it announces.
async fn wait_for_devtools_line(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> Result<String> {
    let pattern =
        Regex::new(r"DevTools listening on (ws://\S+)").expect("startup pattern is valid");

    // Merge both streams into one line channel; Chrome writes the line
    // we need to stderr, but redirect setups vary.
    let (tx, mut rx) = mpsc::channel::<String>(32);
    if let Some(out) = stdout {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
    }
    if let Some(err) = stderr {
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });
    }

    let mut buffered = String::new();
    let mut line_count = 0usize;
    while line_count < STARTUP_LINE_CAP {
        let Some(line) = rx.recv().await else {
            // Both pipes closed; the browser exited or detached its logs.
            break;
        };
        line_count += 1;
        log::debug!("chrome: {}", line);
        buffered.push_str(&line);
        buffered.push('\n');

        if let Some(captures) = pattern.captures(&line) {
            return Ok(captures[1].to_string());
        }
        if line.contains(BIND_ERROR_MARKER) {
            return Err(Html2PdfError::PortConflict(line));
        }
    }

    log::error!("chrome startup output without DevTools line:\n{}", buffered);
    Err(Html2PdfError::LaunchUnconfirmed(format!(
        "no DevTools listening line within {} lines of output",
        STARTUP_LINE_CAP
    )))
}

/// Obtain a page-level WebSocket endpoint from the HTTP discovery API.
async fn discover_page_endpoint(port: u16) -> Result<String> {
    let list_url = format!("http://localhost:{}/json/list", port);
    log::debug!("requesting tab list: {}", list_url);

    let tabs: Vec<TabInfo> = reqwest::get(&list_url)
        .await
        .map_err(|e| Html2PdfError::connection_with("tab list request failed", e))?
        .json()
        .await
        .map_err(|e| Html2PdfError::connection_with("tab list response was not JSON", e))?;
    log::debug!("browser reports {} tab(s)", tabs.len());

    for tab in &tabs {
        if tab.kind == "page" {
            if let Some(url) = &tab.web_socket_debugger_url {
                return Ok(url.clone());
            }
        }
    }

    // No existing page target; open a fresh tab.
    let new_url = format!("http://localhost:{}/json/new", port);
    log::debug!("no page target found, creating one: {}", new_url);

    let tab: TabInfo = reqwest::get(&new_url)
        .await
        .map_err(|e| Html2PdfError::connection_with("new tab request failed", e))?
        .json()
        .await
        .map_err(|e| Html2PdfError::connection_with("new tab response was not JSON", e))?;

    tab.web_socket_debugger_url.ok_or_else(|| {
        Html2PdfError::connection("new tab has no webSocketDebuggerUrl")
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// The allocator takes the requested port when it is free.
    #[tokio::test]
    async fn test_allocate_free_port() {
        // Find a port the OS considers free, release it, then ask for it.
        let probe = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let allocated = allocate_port(port).await.unwrap();
        assert_eq!(allocated, port);
    }

    /// The allocator falls past an occupied port to the next free one.
    #[tokio::test]
    async fn test_allocate_skips_occupied_port() {
        let holder = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let occupied = holder.local_addr().unwrap().port();

        let allocated = allocate_port(occupied).await.unwrap();
        assert!(allocated > occupied, "should skip past the held port");
        assert!(allocated <= occupied + PORT_PROBE_RANGE);
    }

    /// The DevTools pattern extracts the WebSocket URL.
    #[test]
    fn test_devtools_pattern() {
        let pattern = Regex::new(r"DevTools listening on (ws://\S+)").unwrap();
        let line = "DevTools listening on ws://127.0.0.1:9222/devtools/browser/abc-123";
        let captures = pattern.captures(line).expect("line should match");
        assert_eq!(
            &captures[1],
            "ws://127.0.0.1:9222/devtools/browser/abc-123"
        );

        assert!(pattern.captures("Fontconfig warning: ignoring UTF-8").is_none());
    }

    /// Tab JSON from the discovery endpoint deserializes, with and
    /// without the optional fields.
    #[test]
    fn test_tab_info_deserialization() {
        let json = r#"{
            "id": "T1",
            "type": "page",
            "url": "about:blank",
            "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/T1"
        }"#;
        let tab: TabInfo = serde_json::from_str(json).unwrap();
        assert_eq!(tab.kind, "page");
        assert_eq!(
            tab.web_socket_debugger_url.as_deref(),
            Some("ws://localhost:9222/devtools/page/T1")
        );

        let minimal: TabInfo = serde_json::from_str(r#"{"id": "T2"}"#).unwrap();
        assert!(minimal.kind.is_empty());
        assert!(minimal.web_socket_debugger_url.is_none());
    }
}
