//! RAII handle for checked-out sessions.
//!
//! [`SessionHandle`] wraps a session checked out of the pool and
//! releases it when dropped, on success, on error, and during panics
//! alike. The handle derefs to [`CdpClient`], so CDP operations are
//! called directly on it:
//!
//! ```rust,no_run
//! # async fn demo(pool: html2pdf_pool::ChromePool) -> html2pdf_pool::Result<()> {
//! let session = pool.acquire().await?;
//! session.navigate("file:///tmp/page.html").await?;
//! let pdf = session.print_to_pdf(&Default::default()).await?;
//! // session returns to the pool at the end of scope
//! # Ok(())
//! # }
//! ```
//!
//! Whether the session goes back into the idle set or is destroyed is
//! the pool's decision: degraded sessions (transport failure, command
//! timeout) are closed, healthy ones are pooled or handed to a waiter.

use std::sync::Arc;

use crate::cdp::CdpClient;
use crate::pool::PoolInner;

/// A session checked out of the pool.
///
/// Holds the session exclusively until dropped. `Send` so it can move
/// across tasks, but a handle belongs to one logical caller at a time.
pub struct SessionHandle {
    /// `Option` so `Drop` can take ownership.
    session: Option<CdpClient>,
    pool: Arc<PoolInner>,
}

impl SessionHandle {
    pub(crate) fn new(session: CdpClient, pool: Arc<PoolInner>) -> Self {
        Self {
            session: Some(session),
            pool,
        }
    }

    /// The debugging port of the underlying session's browser.
    pub fn port(&self) -> u16 {
        self.session.as_ref().map(CdpClient::port).unwrap_or(0)
    }

    /// Whether the underlying session is still usable.
    ///
    /// A `false` here means the session will be destroyed, not pooled,
    /// when this handle drops.
    pub fn is_healthy(&self) -> bool {
        self.session
            .as_ref()
            .map(CdpClient::is_healthy)
            .unwrap_or(false)
    }
}

impl std::ops::Deref for SessionHandle {
    type Target = CdpClient;

    fn deref(&self) -> &Self::Target {
        self.session
            .as_ref()
            .expect("session present until handle drops")
    }
}

impl Drop for SessionHandle {
    /// Return the session to the pool.
    ///
    /// The release itself is synchronous (counter updates plus either a
    /// queue hand-off or an idle insert); any session destruction it
    /// decides on is spawned onto the pool's runtime.
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!("handle for port {} dropping, releasing session", session.port());
            self.pool.release(session);
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.session {
            Some(session) => f
                .debug_struct("SessionHandle")
                .field("port", &session.port())
                .field("healthy", &session.is_healthy())
                .finish(),
            None => f
                .debug_struct("SessionHandle")
                .field("state", &"released")
                .finish(),
        }
    }
}
