//! Process-wide shared pool.
//!
//! One lazily constructed [`ChromePool`] for the whole process, so every
//! converter in an application reuses the same browsers. Configuration
//! is set through the free functions here *before* first use and is
//! frozen once the pool exists; later writes are rejected.
//!
//! Construction itself never launches a browser: the pool is built with
//! pre-warm disabled, and a background task tops it up to the configured
//! minimum shortly afterwards. The first conversion therefore never
//! blocks on warming a whole fleet.
//!
//! There is no reliable way to run async teardown at process exit in
//! Rust, so call [`shutdown`] from your own exit path; any session that
//! escapes it still kills its browser when dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use html2pdf_pool::shared;
//!
//! # async fn demo() -> html2pdf_pool::Result<()> {
//! shared::set_max_sessions(8)?;
//! let pool = shared::instance();
//! let session = pool.acquire().await?;
//! // ...
//! drop(session);
//! shared::shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::config::{PoolConfig, PoolConfigBuilder};
use crate::error::{Html2PdfError, Result};
use crate::pool::ChromePool;

/// Delay before the background top-up starts, giving process startup
/// room to breathe.
const TOPUP_DELAY: Duration = Duration::from_secs(5);

static INSTANCE: RwLock<Option<Arc<ChromePool>>> = RwLock::new(None);
static CONFIG: Mutex<Option<PoolConfig>> = Mutex::new(None);

/// Whether the shared pool has been constructed.
pub fn is_initialized() -> bool {
    INSTANCE.read().expect("shared pool lock").is_some()
}

fn update_config<F>(mutate: F) -> Result<()>
where
    F: FnOnce(PoolConfigBuilder) -> PoolConfigBuilder,
{
    if is_initialized() {
        return Err(Html2PdfError::Configuration(
            "shared pool already initialized, configuration is frozen".to_string(),
        ));
    }
    let mut slot = CONFIG.lock().expect("shared config lock");
    let current = slot.clone().unwrap_or_default();
    // Rebuild through the builder so validation still applies.
    let builder = mutate(builder_from(current));
    *slot = Some(builder.build()?);
    Ok(())
}

fn builder_from(config: PoolConfig) -> PoolConfigBuilder {
    let mut builder = PoolConfigBuilder::new()
        .base_port(config.base_port)
        .min_sessions(config.min_sessions)
        .max_sessions(config.max_sessions)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.acquire_timeout);
    if let Some(path) = config.chrome_path {
        builder = builder.chrome_path(path);
    }
    builder
}

/// Set the Chrome executable path for the shared pool.
///
/// # Errors
///
/// Fails with [`Html2PdfError::Configuration`] once the pool exists.
pub fn set_chrome_path<P: Into<std::path::PathBuf>>(path: P) -> Result<()> {
    let path = path.into();
    update_config(move |builder| builder.chrome_path(path))
}

/// Set the base debugging port for the shared pool.
pub fn set_base_port(port: u16) -> Result<()> {
    update_config(move |builder| builder.base_port(port))
}

/// Set the minimum session count for the shared pool.
pub fn set_min_sessions(min: usize) -> Result<()> {
    update_config(move |builder| builder.min_sessions(min))
}

/// Set the maximum session count for the shared pool.
pub fn set_max_sessions(max: usize) -> Result<()> {
    update_config(move |builder| builder.max_sessions(max))
}

/// Set the idle eviction timeout for the shared pool.
pub fn set_idle_timeout(timeout: Duration) -> Result<()> {
    update_config(move |builder| builder.idle_timeout(timeout))
}

/// Set the acquire timeout for the shared pool.
pub fn set_acquire_timeout(timeout: Duration) -> Result<()> {
    update_config(move |builder| builder.acquire_timeout(timeout))
}

/// Load shared-pool configuration from a properties file.
///
/// Same keys as [`PoolConfig::from_properties_file`]. Rejected once the
/// pool exists.
pub fn load_properties_file<P: AsRef<std::path::Path>>(path: P) -> Result<()> {
    if is_initialized() {
        return Err(Html2PdfError::Configuration(
            "shared pool already initialized, configuration is frozen".to_string(),
        ));
    }
    let config = PoolConfig::from_properties_file(path)?;
    let mut slot = CONFIG.lock().expect("shared config lock");
    *slot = Some(config);
    Ok(())
}

/// Get the shared pool, constructing it on first call.
///
/// The pool is built with pre-warm disabled; a background task starts a
/// few seconds later and tops it up to the configured minimum, skipping
/// failures.
///
/// # Panics
///
/// Panics if called outside a tokio runtime (pool construction spawns
/// background tasks).
pub fn instance() -> Arc<ChromePool> {
    if let Some(pool) = INSTANCE.read().expect("shared pool lock").as_ref() {
        return Arc::clone(pool);
    }

    let mut slot = INSTANCE.write().expect("shared pool lock");
    // Double-checked: another task may have built it while we waited
    // for the write lock.
    if let Some(pool) = slot.as_ref() {
        return Arc::clone(pool);
    }

    let config = CONFIG
        .lock()
        .expect("shared config lock")
        .clone()
        .unwrap_or_default();
    let configured_min = config.min_sessions;
    log::info!(
        "constructing shared pool: min={} (deferred), max={}, base_port={}",
        configured_min,
        config.max_sessions,
        config.base_port
    );

    // Construction must not block on launching browsers; the top-up
    // task below restores the configured minimum.
    let pool = ChromePool::builder()
        .config(config)
        .build()
        .expect("shared pool construction");
    let pool = Arc::new(pool);
    *slot = Some(Arc::clone(&pool));
    drop(slot);

    if configured_min > 0 {
        let pool_for_topup = Arc::clone(&pool);
        tokio::spawn(async move {
            tokio::time::sleep(TOPUP_DELAY).await;
            log::info!("background top-up toward {} session(s)", configured_min);
            pool_for_topup.ensure_min().await;
        });
    }

    pool
}

/// Shut the shared pool down and forget it.
///
/// Idempotent; a no-op when the pool was never constructed. After this,
/// a later [`instance`] call builds a fresh pool (configuration remains
/// as last set).
pub async fn shutdown() {
    let pool = {
        let mut slot = INSTANCE.write().expect("shared pool lock");
        slot.take()
    };
    if let Some(pool) = pool {
        log::info!("shutting down shared pool");
        pool.shutdown().await;
    }
}

/// Stats of the shared pool, if it has been constructed.
pub fn stats() -> Option<crate::stats::PoolStats> {
    INSTANCE
        .read()
        .expect("shared pool lock")
        .as_ref()
        .map(|pool| pool.stats())
}

// ============================================================================
// Unit Tests
// ============================================================================
