//! Session factory implementations.
//!
//! The pool creates sessions through the [`SessionFactory`] trait so the
//! launch mechanism is pluggable:
//!
//! | Factory | Description |
//! |---------|-------------|
//! | [`ChromeSessionFactory`] | Launches a headless Chrome per session |
//! | [`mock::MockSessionFactory`] | For testing (feature-gated) |
//!
//! Custom factories are also how the test suite drives the pool against
//! an in-process stub CDP server instead of real browsers.

mod chrome;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chrome::ChromeSessionFactory;

use async_trait::async_trait;

use crate::cdp::CdpClient;
use crate::error::Result;

/// Creates CDP sessions for the pool.
///
/// `port` is the debugging port the pool assigned to this session slot;
/// implementations may bind a nearby port instead when it is occupied
/// (the Chrome factory probes upward).
///
/// # Thread Safety
///
/// `Send + Sync` is required because the factory is shared between the
/// pool's callers and its dispatcher task.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Create one connected, `Page`-enabled session.
    ///
    /// # Errors
    ///
    /// Implementations surface launch, port and transport failures with
    /// the corresponding [`Html2PdfError`](crate::Html2PdfError)
    /// variants.
    async fn create(&self, port: u16) -> Result<CdpClient>;
}
