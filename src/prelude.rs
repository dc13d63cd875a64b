//! Convenient imports for common usage patterns.
//!
//! ```rust,ignore
//! use html2pdf_pool::prelude::*;
//! ```
//!
//! Brings in the pool, its builder and configuration, the converter
//! facade, PDF options, the error/result types, and the factory trait.

pub use crate::config::{PoolConfig, PoolConfigBuilder};
pub use crate::convert::HtmlToPdfConverter;
pub use crate::error::{Html2PdfError, Result};
pub use crate::factory::{ChromeSessionFactory, SessionFactory};
pub use crate::handle::SessionHandle;
pub use crate::options::{PdfOptions, PdfOptionsBuilder};
pub use crate::pool::{ChromePool, ChromePoolBuilder};
pub use crate::stats::PoolStats;
pub use crate::SharedChromePool;

#[cfg(feature = "env-config")]
pub use crate::config::env::chrome_path_from_env;

// Arc shows up in nearly every pool-sharing signature.
pub use std::sync::Arc;
