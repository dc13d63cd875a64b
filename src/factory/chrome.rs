//! Chrome-backed session factory.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;

use crate::cdp::CdpClient;
use crate::chrome::{find_chrome, ChromeLauncher};
use crate::error::Result;
use crate::factory::SessionFactory;

/// Factory that launches one headless Chrome process per session.
///
/// The executable path is resolved lazily on the first `create` call
/// and cached for the factory's lifetime, so constructing a pool never
/// touches the filesystem.
///
/// # Example
///
/// ```rust,no_run
/// use html2pdf_pool::ChromeSessionFactory;
///
/// // Auto-discover the browser:
/// let factory = ChromeSessionFactory::with_defaults();
///
/// // Or pin it:
/// let factory = ChromeSessionFactory::with_path("/usr/bin/google-chrome");
/// ```
pub struct ChromeSessionFactory {
    /// Explicit executable path override, if any.
    chrome_path: Option<PathBuf>,
    /// Resolved path, filled on first use.
    resolved: OnceLock<PathBuf>,
}

impl ChromeSessionFactory {
    /// Create a factory that auto-discovers the Chrome executable.
    pub fn with_defaults() -> Self {
        log::debug!("Chrome session factory with auto-discovery");
        Self {
            chrome_path: None,
            resolved: OnceLock::new(),
        }
    }

    /// Create a factory pinned to a specific Chrome executable.
    ///
    /// The path is validated when the first session launches, not here.
    pub fn with_path<P: Into<PathBuf>>(chrome_path: P) -> Self {
        let chrome_path = chrome_path.into();
        log::debug!(
            "Chrome session factory with explicit path: {}",
            chrome_path.display()
        );
        Self {
            chrome_path: Some(chrome_path),
            resolved: OnceLock::new(),
        }
    }

    /// Create a factory from an optional override.
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        match chrome_path {
            Some(path) => Self::with_path(path),
            None => Self::with_defaults(),
        }
    }

    fn resolve(&self) -> Result<&PathBuf> {
        if let Some(path) = self.resolved.get() {
            return Ok(path);
        }
        let path = find_chrome(self.chrome_path.as_deref())?;
        log::info!("using Chrome executable: {}", path.display());
        Ok(self.resolved.get_or_init(|| path))
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    /// Launch a browser near `port`, connect to its page endpoint and
    /// enable the `Page` domain.
    async fn create(&self, port: u16) -> Result<CdpClient> {
        let chrome_path = self.resolve()?.clone();

        let launcher = ChromeLauncher::launch(&chrome_path, port).await?;
        let (child, bound_port, ws_url) = launcher.into_parts();

        // The child moves into the client here; a failed connect drops
        // it, and kill-on-drop reaps the browser.
        let mut client = CdpClient::connect(&ws_url, Some(child), bound_port).await?;

        if let Err(e) = client.enable_page().await {
            client.close().await;
            return Err(e);
        }

        Ok(client)
    }
}

impl std::fmt::Debug for ChromeSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeSessionFactory")
            .field("chrome_path", &self.chrome_path)
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
