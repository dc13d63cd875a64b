//! Mock session factory for testing.
//!
//! Available with the `test-utils` feature or during testing. The mock
//! can be configured to always fail or to fail after a number of
//! creations, tracking attempt counts either way, which exercises the
//! pool's error paths (launch failures during growth, pre-warm skips,
//! exhausted-pool queuing) without Chrome installed.
//!
//! Successful creations delegate to the real
//! [`ChromeSessionFactory`](crate::ChromeSessionFactory), so they still
//! require Chrome; keep tests that must run without a browser on the
//! failing configurations. For full success-path tests, implement
//! [`SessionFactory`] against a stub WebSocket server the way the
//! crate's integration tests do.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::cdp::CdpClient;
use crate::error::{Html2PdfError, Result};
use crate::factory::{ChromeSessionFactory, SessionFactory};

/// A configurable session factory for tests.
///
/// Behavior per [`create`](SessionFactory::create) call:
///
/// - [`always_fails`](Self::always_fails): every call fails with the
///   configured message.
/// - [`fail_after_n`](Self::fail_after_n): the first `n` calls attempt
///   real session creation, later calls fail with the message.
/// - [`new`](Self::new): every call attempts real session creation.
///
/// Every call increments the attempt counter, success or not.
///
/// # Example
///
/// ```rust,ignore
/// use html2pdf_pool::factory::mock::MockSessionFactory;
///
/// let factory = MockSessionFactory::always_fails("no browser in CI");
/// assert_eq!(factory.creation_count(), 0);
///
/// // Fails from the very first attempt, Chrome never touched:
/// let factory = MockSessionFactory::fail_after_n(0, "exhausted");
/// ```
pub struct MockSessionFactory {
    /// Fail every creation, regardless of count.
    should_fail: bool,

    /// Message returned on configured failures.
    error_message: String,

    /// Creation attempts so far.
    creation_count: Arc<AtomicUsize>,

    /// Fail once this many creations have been attempted.
    fail_after: Option<usize>,

    /// Real factory used for attempts that are allowed to succeed.
    delegate: ChromeSessionFactory,
}

impl MockSessionFactory {
    /// Create a mock that attempts real session creation on every call.
    ///
    /// Still requires Chrome to actually succeed; use
    /// [`always_fails`](Self::always_fails) for browser-free tests.
    pub fn new() -> Self {
        Self {
            should_fail: false,
            error_message: String::new(),
            creation_count: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
            delegate: ChromeSessionFactory::with_defaults(),
        }
    }

    /// Create a mock that fails every creation with `message`.
    pub fn always_fails<S: Into<String>>(message: S) -> Self {
        Self {
            should_fail: true,
            error_message: message.into(),
            creation_count: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
            delegate: ChromeSessionFactory::with_defaults(),
        }
    }

    /// Create a mock that fails after `n` creation attempts.
    ///
    /// The first `n` calls attempt real session creation (requiring
    /// Chrome to succeed); from call `n + 1` on, creation fails with
    /// `message`. `n = 0` fails from the first call without touching
    /// the browser.
    pub fn fail_after_n<S: Into<String>>(n: usize, message: S) -> Self {
        Self {
            should_fail: false,
            error_message: message.into(),
            creation_count: Arc::new(AtomicUsize::new(0)),
            fail_after: Some(n),
            delegate: ChromeSessionFactory::with_defaults(),
        }
    }

    /// Number of creation attempts so far.
    pub fn creation_count(&self) -> usize {
        self.creation_count.load(Ordering::SeqCst)
    }

    /// Reset the attempt counter to zero.
    pub fn reset_count(&self) {
        self.creation_count.store(0, Ordering::SeqCst);
    }

    /// Shared handle to the attempt counter, usable after the factory
    /// has moved into a pool.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.creation_count)
    }
}

impl Default for MockSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn create(&self, port: u16) -> Result<CdpClient> {
        let count = self.creation_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            log::debug!(
                "mock factory refusing to create session on port {}: {}",
                port,
                self.error_message
            );
            return Err(Html2PdfError::connection(self.error_message.clone()));
        }

        if let Some(fail_after) = self.fail_after {
            if count >= fail_after {
                log::debug!(
                    "mock factory failing after {} creation(s): {}",
                    fail_after,
                    self.error_message
                );
                return Err(Html2PdfError::connection(self.error_message.clone()));
            }
        }

        log::debug!(
            "mock factory attempting real session creation #{} on port {}",
            count + 1,
            port
        );
        self.delegate.create(port).await
    }
}

impl std::fmt::Debug for MockSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSessionFactory")
            .field("should_fail", &self.should_fail)
            .field("error_message", &self.error_message)
            .field(
                "creation_count",
                &self.creation_count.load(Ordering::SeqCst),
            )
            .field("fail_after", &self.fail_after)
            .finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// always_fails fails with the configured message and counts
    /// attempts.
    #[tokio::test]
    async fn test_mock_factory_fails_and_counts() {
        let factory = MockSessionFactory::always_fails("Test error");
        assert_eq!(factory.creation_count(), 0);

        let result = factory.create(9222).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Test error"));
        assert_eq!(factory.creation_count(), 1);

        let _ = factory.create(9223).await;
        assert_eq!(factory.creation_count(), 2);
    }

    /// fail_after_n(0) fails from the very first attempt with the
    /// configured message, never reaching the real factory.
    #[tokio::test]
    async fn test_mock_factory_fail_after_zero() {
        let factory = MockSessionFactory::fail_after_n(0, "Exhausted");

        for attempt in 1..=3 {
            let result = factory.create(9222).await;
            assert!(result.is_err());
            assert!(
                result.unwrap_err().to_string().contains("Exhausted"),
                "attempt {} should carry the configured message",
                attempt
            );
            assert_eq!(factory.creation_count(), attempt);
        }
    }

    /// reset_count returns the counter to zero.
    #[tokio::test]
    async fn test_mock_factory_reset_count() {
        let factory = MockSessionFactory::always_fails("Test");

        let _ = factory.create(9222).await;
        let _ = factory.create(9223).await;
        assert_eq!(factory.creation_count(), 2);

        factory.reset_count();
        assert_eq!(factory.creation_count(), 0);
    }

    /// The shared counter observes attempts after the factory moved.
    #[tokio::test]
    async fn test_mock_factory_shared_counter() {
        let factory = MockSessionFactory::always_fails("gone");
        let counter = factory.counter();

        let boxed: Box<dyn SessionFactory> = Box::new(factory);
        let _ = boxed.create(9300).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    /// Default construction matches new(): real creation, no failure
    /// configuration.
    #[test]
    fn test_mock_factory_default() {
        let factory: MockSessionFactory = Default::default();
        assert_eq!(factory.creation_count(), 0);
        assert!(!factory.should_fail);
        assert!(factory.fail_after.is_none());
    }

    /// Debug output names the configuration.
    #[test]
    fn test_mock_factory_debug() {
        let factory = MockSessionFactory::always_fails("Test");
        let debug_str = format!("{:?}", factory);

        assert!(debug_str.contains("MockSessionFactory"));
        assert!(debug_str.contains("should_fail"));
        assert!(debug_str.contains("true"));
    }
}
