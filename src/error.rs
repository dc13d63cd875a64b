//! Error types for the conversion library.
//!
//! This module provides [`Html2PdfError`], a unified error type covering
//! browser discovery, launching, the CDP transport, the connection pool,
//! and PDF generation, plus a convenient [`Result`] type alias.
//!
//! # Example
//!
//! ```rust
//! use html2pdf_pool::{Html2PdfError, Result};
//!
//! fn render() -> Result<Vec<u8>> {
//!     Err(Html2PdfError::PoolClosed)
//! }
//!
//! match render() {
//!     Ok(pdf) => println!("Generated {} bytes", pdf.len()),
//!     Err(Html2PdfError::PoolClosed) => println!("Pool is shut down"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

/// Errors that can occur while converting HTML to PDF.
///
/// Each variant corresponds to one failure class in the pipeline:
/// locating the browser, allocating a debugging port, launching the
/// process, speaking CDP over the WebSocket, pooling, and the final
/// PDF print. Variants carry a human-readable message and, where an
/// underlying error exists, preserve it as the `source`.
#[derive(Debug, thiserror::Error)]
pub enum Html2PdfError {
    /// No Chrome/Chromium executable could be located.
    ///
    /// Raised when an explicit path does not name an executable file, or
    /// when every platform candidate and the OS lookup command failed.
    #[error("Chrome executable not found: {0}")]
    ChromeNotFound(String),

    /// No free debugging port could be allocated.
    ///
    /// The launcher probes the requested port and the following 100
    /// ports; this means all of them were bound.
    #[error("no free debugging port: {0}")]
    PortUnavailable(String),

    /// The browser started but never printed its DevTools listening line.
    ///
    /// The launcher reads up to 100 lines of combined output looking for
    /// `DevTools listening on ws://...`; hitting the cap ends up here.
    #[error("could not confirm Chrome debugger startup: {0}")]
    LaunchUnconfirmed(String),

    /// The browser reported a bind error for the debugging port.
    ///
    /// Detected from the `bind() returned an error` marker in the child's
    /// startup output. The port probe is inherently racy (bind, release,
    /// spawn), so this can happen even after a successful probe.
    #[error("debugging port conflict: {0}")]
    PortConflict(String),

    /// The CDP transport failed to open or closed unexpectedly.
    ///
    /// Every command pending at the moment the connection drops fails
    /// with this variant.
    #[error("CDP connection error: {message}")]
    Connection {
        /// What went wrong.
        message: String,
        /// Underlying transport error, when there is one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// `Page.navigate` returned an error field.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// `Page.printToPDF` failed or produced no data.
    ///
    /// Covers protocol errors, a missing `result.data` field, and
    /// malformed base64 payloads.
    #[error("PDF generation failed: {0}")]
    PdfGeneration(String),

    /// An operation was attempted after the pool shut down.
    ///
    /// Acquires fail with this immediately, and waiters that were queued
    /// when shutdown began are completed with it.
    #[error("connection pool is closed")]
    PoolClosed,

    /// Waiting for a pooled session exceeded the acquire timeout.
    #[error("timed out waiting for a session after {0:?}")]
    AcquireTimeout(std::time::Duration),

    /// A CDP command did not complete within the command deadline.
    ///
    /// The session that timed out is considered degraded and will be
    /// destroyed on release rather than returned to the pool.
    #[error("CDP command {method} (id {id}) timed out after {timeout:?}")]
    CommandTimeout {
        /// The CDP method that was in flight.
        method: String,
        /// The request id the command was sent with.
        id: u64,
        /// The deadline that elapsed.
        timeout: std::time::Duration,
    },

    /// Invalid configuration or builder input.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A filesystem operation failed (reading HTML, writing PDF, temp files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Html2PdfError {
    /// Build a [`Connection`](Self::Connection) error with no underlying cause.
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Html2PdfError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`Connection`](Self::Connection) error wrapping a cause.
    pub fn connection_with<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Html2PdfError::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convenience conversion from [`String`] to [`Html2PdfError::Configuration`].
///
/// Allows using the `?` operator with builder code that reports plain
/// string errors.
impl From<String> for Html2PdfError {
    fn from(msg: String) -> Self {
        Html2PdfError::Configuration(msg)
    }
}

/// Convenience conversion from `&str` to [`Html2PdfError::Configuration`].
impl From<&str> for Html2PdfError {
    fn from(msg: &str) -> Self {
        Html2PdfError::Configuration(msg.to_string())
    }
}

/// Result type alias using [`Html2PdfError`].
pub type Result<T> = std::result::Result<T, Html2PdfError>;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Verifies error type conversions from String and &str.
    #[test]
    fn test_error_conversion() {
        let error: Html2PdfError = "test error".into();
        match error {
            Html2PdfError::Configuration(msg) => {
                assert_eq!(msg, "test error", "Error message should be preserved");
            }
            _ => panic!("Expected Configuration error variant"),
        }

        let error: Html2PdfError = "another error".to_string().into();
        match error {
            Html2PdfError::Configuration(msg) => {
                assert_eq!(msg, "another error", "Error message should be preserved");
            }
            _ => panic!("Expected Configuration error variant"),
        }
    }

    /// Verifies that error Display formatting works correctly.
    #[test]
    fn test_error_display() {
        let error = Html2PdfError::ChromeNotFound("no candidates matched".to_string());
        assert_eq!(
            error.to_string(),
            "Chrome executable not found: no candidates matched"
        );

        let error = Html2PdfError::PoolClosed;
        assert_eq!(error.to_string(), "connection pool is closed");

        let error = Html2PdfError::AcquireTimeout(Duration::from_secs(5));
        assert!(error.to_string().contains("5s"));

        let error = Html2PdfError::CommandTimeout {
            method: "Page.printToPDF".to_string(),
            id: 7,
            timeout: Duration::from_secs(30),
        };
        assert!(error.to_string().contains("Page.printToPDF"));
        assert!(error.to_string().contains("id 7"));
    }

    /// Verifies the causal chain is preserved on connection errors.
    #[test]
    fn test_connection_error_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error = Html2PdfError::connection_with("websocket dropped", io);

        assert!(error.to_string().contains("websocket dropped"));
        let source = std::error::Error::source(&error).expect("source should be set");
        assert!(source.to_string().contains("reset by peer"));

        let bare = Html2PdfError::connection("never opened");
        assert!(std::error::Error::source(&bare).is_none());
    }

    /// Verifies that Html2PdfError implements std::error::Error.
    #[test]
    fn test_error_is_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Html2PdfError>();
    }

    /// Verifies that Html2PdfError is Send + Sync for thread safety.
    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Html2PdfError>();
    }
}
