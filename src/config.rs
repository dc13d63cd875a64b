//! Pool configuration and loading.
//!
//! This module provides [`PoolConfig`] and [`PoolConfigBuilder`] for
//! configuring pool size, port layout and timeouts, plus loading from
//! a properties-style key/value file.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use html2pdf_pool::PoolConfigBuilder;
//!
//! let config = PoolConfigBuilder::new()
//!     .min_sessions(1)
//!     .max_sessions(4)
//!     .idle_timeout(Duration::from_secs(120))
//!     .build()
//!     .expect("Invalid configuration");
//!
//! assert_eq!(config.max_sessions, 4);
//! assert_eq!(config.base_port, 9222);
//! ```
//!
//! # Configuration file
//!
//! [`PoolConfig::from_properties_file`] reads the same `key=value` format
//! the configuration keys are documented in:
//!
//! ```text
//! html2pdf.chrome.path=/usr/bin/google-chrome
//! html2pdf.pool.min-connections=2
//! html2pdf.pool.max-connections=10
//! html2pdf.pool.base-port=9222
//! html2pdf.pool.idle-timeout-seconds=300
//! ```
//!
//! Unparsable values are logged and skipped; missing keys keep their
//! defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Html2PdfError, Result};

/// Default base debugging port.
pub const DEFAULT_BASE_PORT: u16 = 9222;
/// Default minimum number of pooled sessions.
pub const DEFAULT_MIN_SESSIONS: usize = 2;
/// Default maximum number of pooled sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 5;
/// Default idle eviction timeout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
/// Default acquire timeout.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the Chrome session pool.
///
/// Immutable once the pool is built. Use [`PoolConfigBuilder`] for
/// validation and convenience.
///
/// | Field | Default |
/// |-------|---------|
/// | `chrome_path` | `None` (auto-discovery at launch time) |
/// | `base_port` | 9222 |
/// | `min_sessions` | 2 |
/// | `max_sessions` | 5 |
/// | `idle_timeout` | 5 minutes |
/// | `acquire_timeout` | 30 seconds |
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Explicit Chrome executable path. `None` means auto-discovery
    /// when the first session launches.
    pub chrome_path: Option<PathBuf>,

    /// Base remote-debugging port. Session *n* is launched on
    /// `base_port + n` (with per-launch probing past occupied ports).
    pub base_port: u16,

    /// Number of sessions `prewarm`/`ensure_min` aims to keep alive.
    /// Idle eviction never shrinks the pool below this.
    pub min_sessions: usize,

    /// Hard cap on live sessions. Acquire queues once it is reached.
    pub max_sessions: usize,

    /// Idle sessions older than this are evicted (down to `min_sessions`).
    /// Also the period of the eviction sweep.
    pub idle_timeout: Duration,

    /// How long an acquire may wait for a session before failing.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            base_port: DEFAULT_BASE_PORT,
            min_sessions: DEFAULT_MIN_SESSIONS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolConfig {
    /// Create a builder with default values.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    /// Load configuration from a properties-style file.
    ///
    /// Recognized keys:
    ///
    /// - `html2pdf.chrome.path`
    /// - `html2pdf.pool.min-connections`
    /// - `html2pdf.pool.max-connections`
    /// - `html2pdf.pool.base-port`
    /// - `html2pdf.pool.idle-timeout-seconds`
    ///
    /// Lines starting with `#` or `!` and blank lines are ignored.
    /// Values that fail to parse are logged at warn level and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Html2PdfError::Io`] if the file cannot be read and
    /// [`Html2PdfError::Configuration`] if the resulting configuration
    /// is invalid.
    pub fn from_properties_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut builder = PoolConfigBuilder::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if value.is_empty() {
                continue;
            }

            match key {
                "html2pdf.chrome.path" => {
                    builder = builder.chrome_path(value);
                }
                "html2pdf.pool.min-connections" => match value.parse::<usize>() {
                    Ok(n) => builder = builder.min_sessions(n),
                    Err(_) => log::warn!("could not parse min-connections value: {}", value),
                },
                "html2pdf.pool.max-connections" => match value.parse::<usize>() {
                    Ok(n) => builder = builder.max_sessions(n),
                    Err(_) => log::warn!("could not parse max-connections value: {}", value),
                },
                "html2pdf.pool.base-port" => match value.parse::<u16>() {
                    Ok(p) => builder = builder.base_port(p),
                    Err(_) => log::warn!("could not parse base-port value: {}", value),
                },
                "html2pdf.pool.idle-timeout-seconds" => match value.parse::<u64>() {
                    Ok(s) => builder = builder.idle_timeout(Duration::from_secs(s)),
                    Err(_) => log::warn!("could not parse idle-timeout-seconds value: {}", value),
                },
                other => log::debug!("ignoring unknown configuration key: {}", other),
            }
        }

        let config = builder.build()?;
        log::info!(
            "loaded pool configuration from file: min={}, max={}, base_port={}, idle_timeout={:?}",
            config.min_sessions,
            config.max_sessions,
            config.base_port,
            config.idle_timeout
        );
        Ok(config)
    }
}

/// Builder for [`PoolConfig`] with validation.
///
/// # Validation
///
/// [`build()`](Self::build) checks:
/// - `max_sessions` must be greater than 0
/// - `min_sessions` must not exceed `max_sessions`
/// - `idle_timeout` and `acquire_timeout` must be non-zero
#[derive(Debug, Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: PoolConfig::default(),
        }
    }

    /// Set an explicit Chrome executable path.
    pub fn chrome_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Set the base remote-debugging port.
    pub fn base_port(mut self, port: u16) -> Self {
        self.config.base_port = port;
        self
    }

    /// Set the minimum pooled session count.
    pub fn min_sessions(mut self, min: usize) -> Self {
        self.config.min_sessions = min;
        self
    }

    /// Set the maximum pooled session count.
    pub fn max_sessions(mut self, max: usize) -> Self {
        self.config.max_sessions = max;
        self
    }

    /// Set the idle eviction timeout (and sweep period).
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Set the acquire wait timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Html2PdfError::Configuration`] on invalid combinations.
    pub fn build(self) -> Result<PoolConfig> {
        if self.config.max_sessions == 0 {
            return Err(Html2PdfError::Configuration(
                "max_sessions must be greater than 0".to_string(),
            ));
        }
        if self.config.min_sessions > self.config.max_sessions {
            return Err(Html2PdfError::Configuration(format!(
                "min_sessions ({}) cannot exceed max_sessions ({})",
                self.config.min_sessions, self.config.max_sessions
            )));
        }
        if self.config.idle_timeout.is_zero() {
            return Err(Html2PdfError::Configuration(
                "idle_timeout must be greater than zero".to_string(),
            ));
        }
        if self.config.acquire_timeout.is_zero() {
            return Err(Html2PdfError::Configuration(
                "acquire_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}

// ============================================================================
// Environment Configuration (feature-gated)
// ============================================================================

/// Environment-based configuration helpers.
///
/// Only available when the `env-config` feature is enabled.
#[cfg(feature = "env-config")]
pub mod env {
    /// Get the Chrome path from the `CHROME_PATH` environment variable.
    ///
    /// Also picks up a `.env` file if one is present in the working
    /// directory.
    ///
    /// # Returns
    ///
    /// - `Some(path)` if `CHROME_PATH` is set
    /// - `None` if not set (auto-discovery will be used)
    pub fn chrome_path_from_env() -> Option<String> {
        dotenv::var("CHROME_PATH").ok()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
