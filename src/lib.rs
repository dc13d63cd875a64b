//! # html2pdf-pool
//!
//! HTML→PDF conversion backed by a pool of headless Chrome processes
//! driven over the Chrome DevTools Protocol (CDP).
//!
//! The crate owns the whole path from browser binary to PDF bytes:
//! executable discovery, process launch with remote debugging, the CDP
//! WebSocket session with id-correlated request/response, and a bounded
//! session pool with queueing, timeouts, idle eviction and graceful
//! shutdown.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │        HtmlToPdfConverter (facade)            │
//! │   file / string → file:// URL → PDF bytes     │
//! └─────────────────────┬─────────────────────────┘
//!                       │ acquire / release
//!                       ▼
//! ┌───────────────────────────────────────────────┐
//! │                 ChromePool                    │
//! │ ┌───────────────────────────────────────────┐ │
//! │ │ idle set   [Session] [Session] [Session]  │ │
//! │ └───────────────────────────────────────────┘ │
//! │ ┌───────────────────────────────────────────┐ │
//! │ │ wait queue (FIFO tickets) + dispatcher    │ │
//! │ └───────────────────────────────────────────┘ │
//! │ ┌───────────────────────────────────────────┐ │
//! │ │ idle evictor (timeout sweep, floor = min) │ │
//! │ └───────────────────────────────────────────┘ │
//! └─────────────────────┬─────────────────────────┘
//!                       │ launch / connect
//!                       ▼
//! ┌───────────────────────────────────────────────┐
//! │   CdpClient ⇄ headless Chrome subprocess      │
//! │   (WebSocket JSON frames, id correlation)     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use html2pdf_pool::{ChromePool, HtmlToPdfConverter, PdfOptions, PoolConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = Arc::new(
//!         ChromePool::builder()
//!             .config(
//!                 PoolConfigBuilder::new()
//!                     .min_sessions(1)
//!                     .max_sessions(4)
//!                     .build()?,
//!             )
//!             .build()?,
//!     );
//!     pool.prewarm().await;
//!
//!     let converter = HtmlToPdfConverter::new(Arc::clone(&pool));
//!     converter
//!         .convert("input.html", "output.pdf", &PdfOptions::default())
//!         .await?;
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! Or lean on the process-wide [`shared`] pool:
//!
//! ```rust,no_run
//! use html2pdf_pool::{convert_html_to_bytes, PdfOptions};
//!
//! # async fn demo() -> html2pdf_pool::Result<()> {
//! let pdf = convert_html_to_bytes("<html><body>Hello</body></html>", &PdfOptions::default()).await?;
//! assert!(pdf.starts_with(b"%PDF"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! Everything fallible returns [`Result`] with [`Html2PdfError`], one
//! variant per failure class (browser not found, port conflicts,
//! launch confirmation, transport, navigation, PDF generation, pool
//! closed, acquire/command timeouts). Causes are preserved via
//! `std::error::Error::source`.
//!
//! ## Feature flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `env-config` | `CHROME_PATH` lookup via dotenv |
//! | `test-utils` | Mock session factory for pool testing |
//! | `cli` | The `html2pdf` command-line driver |

#![warn(missing_docs)]

pub mod cdp;
pub mod chrome;
pub mod config;
pub mod convert;
pub mod error;
pub mod factory;
pub mod handle;
pub mod options;
pub mod pool;
pub mod prelude;
pub mod shared;
pub mod stats;

// ============================================================================
// Re-exports (public API)
// ============================================================================

pub use config::{PoolConfig, PoolConfigBuilder};
pub use convert::{
    convert_file, convert_html_to_bytes, convert_to_bytes, HtmlToPdfConverter,
};
pub use error::{Html2PdfError, Result};
pub use factory::{ChromeSessionFactory, SessionFactory};
pub use handle::SessionHandle;
pub use options::{PdfOptions, PdfOptionsBuilder};
pub use pool::{ChromePool, ChromePoolBuilder};
pub use stats::PoolStats;

#[cfg(feature = "env-config")]
pub use config::env::chrome_path_from_env;

/// Shared pool type for passing one pool around an application.
pub type SharedChromePool = std::sync::Arc<ChromePool>;
