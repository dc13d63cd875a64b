//! The Chrome session pool.
//!
//! [`ChromePool`] multiplexes many concurrent conversion requests onto a
//! bounded set of long-lived CDP sessions. The moving parts:
//!
//! ```text
//! ChromePool
//!   ├─ PoolInner (shared state, Arc)
//!   │   ├─ idle: VecDeque<PooledEntry>      (sessions ready for checkout)
//!   │   ├─ waiters: VecDeque<WaitTicket>    (FIFO acquire queue)
//!   │   ├─ total / active / waiting         (atomic counters)
//!   │   └─ factory: Box<dyn SessionFactory>
//!   ├─ dispatcher task   (drains the wait queue, ~100 ms poll)
//!   └─ evictor task      (idle-timeout sweep, floor at min_sessions)
//! ```
//!
//! # Acquire paths
//!
//! 1. **Fast**: pop an idle session.
//! 2. **Growth**: while `total < max`, claim a slot with a CAS and launch
//!    a new browser on `base_port + slot`; a failed launch undoes the
//!    claim.
//! 3. **Slow**: queue a wait ticket and suspend until a release hands a
//!    session over, the dispatcher serves the ticket, or the acquire
//!    timeout expires.
//!
//! Releases short-circuit: a returning session goes straight to the
//! waiter at the head of the queue without an idle round-trip. Under
//! contention past `max`, that hand-off is the throughput path.
//!
//! # Invariants
//!
//! - `total <= max_sessions` at all times (CAS-bounded growth).
//! - `idle + handed-out == total` at stable points.
//! - Every session the pool ever created is either released back or
//!   closed; unhealthy sessions are destroyed on release, never pooled.
//! - After shutdown no session is created and every acquire fails.
//!
//! # Example
//!
//! ```rust,no_run
//! use html2pdf_pool::{ChromePool, PoolConfigBuilder};
//!
//! # async fn demo() -> html2pdf_pool::Result<()> {
//! let pool = ChromePool::builder()
//!     .config(PoolConfigBuilder::new().min_sessions(1).max_sessions(4).build()?)
//!     .build()?;
//!
//! pool.prewarm().await;
//!
//! {
//!     let session = pool.acquire().await?;
//!     session.navigate("file:///tmp/page.html").await?;
//! } // session returns to the pool here
//!
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::cdp::CdpClient;
use crate::config::PoolConfig;
use crate::error::{Html2PdfError, Result};
use crate::factory::{ChromeSessionFactory, SessionFactory};
use crate::handle::SessionHandle;
use crate::stats::PoolStats;

/// Poll period of the dispatcher when the wait queue is empty or
/// unservable.
const DISPATCH_POLL: Duration = Duration::from_millis(100);
/// Per-session creation cap during prewarm and ensure_min.
const CREATE_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause between serial creations in ensure_min.
const ENSURE_MIN_PAUSE: Duration = Duration::from_secs(1);
/// Bounded join given to background tasks during shutdown.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// An idle session plus the moment it was last handed back.
struct PooledEntry {
    session: CdpClient,
    last_used: Instant,
}

/// A queued acquire: single-use completion slot plus bookkeeping.
struct WaitTicket {
    id: u64,
    tx: oneshot::Sender<Result<CdpClient>>,
    enqueued_at: Instant,
}

/// Shared pool state. Everything that must survive the public
/// [`ChromePool`] value (handles keep it alive through their `Arc`).
pub(crate) struct PoolInner {
    config: PoolConfig,
    factory: Box<dyn SessionFactory>,

    /// Sessions ready for checkout. Pushed at the back on release,
    /// popped at the front on acquire, aged out at the front by the
    /// evictor.
    idle: Mutex<VecDeque<PooledEntry>>,

    /// FIFO queue of suspended acquires.
    waiters: Mutex<VecDeque<WaitTicket>>,

    /// Live sessions (idle + handed out). Never exceeds
    /// `config.max_sessions`.
    total: AtomicUsize,
    /// Sessions handed out to callers. Incremented by whichever side
    /// hands the session over, before the waiter resumes.
    active: AtomicUsize,
    /// Queued acquires.
    waiting: AtomicUsize,

    next_ticket_id: AtomicU64,
    shutdown: AtomicBool,
    /// Wakes the background tasks immediately on shutdown instead of
    /// letting them finish a full sleep period.
    shutdown_notify: tokio::sync::Notify,

    /// Captured at construction so `Drop`-time releases can spawn async
    /// cleanup from sync contexts.
    runtime: tokio::runtime::Handle,
}

impl PoolInner {
    fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Claim a growth slot: atomically bump `total` while it is below
    /// `cap`, returning the claimed index. Increment-then-undo on launch
    /// failure keeps the bound exact under concurrency.
    fn claim_slot(&self, cap: usize) -> Option<usize> {
        loop {
            let current = self.total.load(Ordering::SeqCst);
            if current >= cap {
                return None;
            }
            if self
                .total
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Some(current);
            }
        }
    }

    /// Debugging port for a claimed slot.
    fn port_for_slot(&self, slot: usize) -> u16 {
        self.config
            .base_port
            .saturating_add(slot.min(u16::MAX as usize) as u16)
    }

    /// Fast path + growth path. Returns a session with no counters
    /// touched beyond `total`; the caller accounts for `active`.
    async fn try_obtain(self: &Arc<Self>) -> Option<CdpClient> {
        // Fast path: reuse an idle session, discarding any that died
        // while parked.
        loop {
            let entry = {
                let mut idle = self.idle.lock().expect("idle set lock");
                idle.pop_front()
            };
            match entry {
                Some(entry) if entry.session.is_healthy() => {
                    log::debug!("reusing pooled session on port {}", entry.session.port());
                    return Some(entry.session);
                }
                Some(entry) => {
                    log::warn!(
                        "discarding dead session on port {} from idle set",
                        entry.session.port()
                    );
                    self.total.fetch_sub(1, Ordering::SeqCst);
                    self.spawn_close(entry.session);
                }
                None => break,
            }
        }

        // Growth path: launch a new browser if there is room.
        let slot = self.claim_slot(self.config.max_sessions)?;
        let port = self.port_for_slot(slot);
        log::info!(
            "growing pool: launching session {} of {} (port {})",
            slot + 1,
            self.config.max_sessions,
            port
        );
        match self.factory.create(port).await {
            Ok(session) => Some(session),
            Err(e) => {
                self.total.fetch_sub(1, Ordering::SeqCst);
                log::warn!("session launch failed, slot released: {}", e);
                None
            }
        }
    }

    /// Acquire a raw session (the public API wraps it in a
    /// [`SessionHandle`]).
    async fn acquire_session(self: &Arc<Self>) -> Result<CdpClient> {
        if self.is_shut_down() {
            return Err(Html2PdfError::PoolClosed);
        }

        if let Some(session) = self.try_obtain().await {
            self.active.fetch_add(1, Ordering::SeqCst);
            return Ok(session);
        }

        // Slow path: queue a ticket and wait for a hand-off.
        let (tx, rx) = oneshot::channel();
        let id = self.next_ticket_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut waiters = self.waiters.lock().expect("wait queue lock");
            waiters.push_back(WaitTicket {
                id,
                tx,
                enqueued_at: Instant::now(),
            });
        }
        self.waiting.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "no session available, queued ticket {} (waiting: {})",
            id,
            self.waiting.load(Ordering::SeqCst)
        );

        match tokio::time::timeout(self.config.acquire_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without completing: only shutdown does that.
            Ok(Err(_)) => Err(Html2PdfError::PoolClosed),
            Err(_) => {
                let removed = {
                    let mut waiters = self.waiters.lock().expect("wait queue lock");
                    match waiters.iter().position(|ticket| ticket.id == id) {
                        Some(index) => {
                            waiters.remove(index);
                            true
                        }
                        None => false,
                    }
                };
                if removed {
                    // Still queued: nobody else will account for us.
                    self.waiting.fetch_sub(1, Ordering::SeqCst);
                }
                log::warn!(
                    "acquire timed out after {:?} (ticket {})",
                    self.config.acquire_timeout,
                    id
                );
                Err(Html2PdfError::AcquireTimeout(self.config.acquire_timeout))
            }
        }
    }

    /// Return a session to the pool.
    ///
    /// Called from [`SessionHandle::drop`]; must stay synchronous.
    pub(crate) fn release(self: &Arc<Self>, session: CdpClient) {
        if self.is_shut_down() {
            log::debug!("pool shut down, destroying released session");
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.total.fetch_sub(1, Ordering::SeqCst);
            self.spawn_close(session);
            return;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if !session.is_healthy() {
            log::warn!(
                "released session on port {} is degraded, destroying it",
                session.port()
            );
            self.total.fetch_sub(1, Ordering::SeqCst);
            self.spawn_close(session);
            return;
        }

        self.hand_off_or_park(session);
    }

    /// Give the session to the waiter at the head of the queue, or park
    /// it in the idle set. `active` is adjusted *before* each hand-off
    /// attempt so a resumed waiter already observes itself counted.
    fn hand_off_or_park(self: &Arc<Self>, session: CdpClient) {
        let mut session = session;
        loop {
            let ticket = {
                let mut waiters = self.waiters.lock().expect("wait queue lock");
                waiters.pop_front()
            };
            let Some(ticket) = ticket else {
                log::debug!("parking session on port {} in idle set", session.port());
                let mut idle = self.idle.lock().expect("idle set lock");
                idle.push_back(PooledEntry {
                    session,
                    last_used: Instant::now(),
                });
                return;
            };

            self.waiting.fetch_sub(1, Ordering::SeqCst);
            self.active.fetch_add(1, Ordering::SeqCst);
            log::debug!(
                "handing session directly to ticket {} (queued {:?} ago)",
                ticket.id,
                ticket.enqueued_at.elapsed()
            );
            match ticket.tx.send(Ok(session)) {
                Ok(()) => return,
                Err(returned) => {
                    // Waiter timed out between dequeue and send; undo
                    // and try the next ticket.
                    self.active.fetch_sub(1, Ordering::SeqCst);
                    match returned {
                        Ok(recovered) => session = recovered,
                        Err(_) => return,
                    }
                }
            }
        }
    }

    /// Create a session for `slot` directly through the factory.
    async fn create_for_slot(&self, slot: usize) -> Result<CdpClient> {
        self.factory.create(self.port_for_slot(slot)).await
    }

    /// Close a session from a sync context.
    fn spawn_close(&self, session: CdpClient) {
        self.runtime.spawn(async move {
            let mut session = session;
            session.close().await;
        });
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            total: self.total.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
            idle: self.idle.lock().map(|idle| idle.len()).unwrap_or(0),
            waiting: self.waiting.load(Ordering::SeqCst),
        }
    }
}

/// Wait-queue progress worker.
///
/// Release-driven hand-offs cover the common case; this loop covers the
/// rest: tickets queued while the pool still had growth room, and
/// tickets racing eviction. Tickets it cannot serve go back to the
/// *front* of the queue so FIFO order is preserved.
async fn dispatcher_loop(inner: Arc<PoolInner>) {
    log::debug!("dispatcher task started");
    loop {
        if inner.is_shut_down() {
            break;
        }

        let ticket = {
            let mut waiters = inner.waiters.lock().expect("wait queue lock");
            waiters.pop_front()
        };
        let Some(ticket) = ticket else {
            tokio::select! {
                _ = tokio::time::sleep(DISPATCH_POLL) => {}
                _ = inner.shutdown_notify.notified() => break,
            }
            continue;
        };
        inner.waiting.fetch_sub(1, Ordering::SeqCst);

        // A ticket whose receiver is gone timed out while we held it;
        // it was already accounted for, just drop it.
        if ticket.tx.is_closed() {
            log::debug!("discarding abandoned ticket {}", ticket.id);
            continue;
        }

        match inner.try_obtain().await {
            Some(session) => {
                inner.active.fetch_add(1, Ordering::SeqCst);
                if let Err(returned) = ticket.tx.send(Ok(session)) {
                    inner.active.fetch_sub(1, Ordering::SeqCst);
                    if let Ok(session) = returned {
                        inner.hand_off_or_park(session);
                    }
                }
            }
            None => {
                if inner.is_shut_down() {
                    let _ = ticket.tx.send(Err(Html2PdfError::PoolClosed));
                    break;
                }
                if !ticket.tx.is_closed() {
                    let mut waiters = inner.waiters.lock().expect("wait queue lock");
                    waiters.push_front(ticket);
                    drop(waiters);
                    inner.waiting.fetch_add(1, Ordering::SeqCst);
                }
                tokio::select! {
                    _ = tokio::time::sleep(DISPATCH_POLL) => {}
                    _ = inner.shutdown_notify.notified() => break,
                }
            }
        }
    }
    log::debug!("dispatcher task exiting");
}

/// Idle-eviction sweep, one pass per `idle_timeout` period.
///
/// Removes idle sessions older than the timeout while `total` stays
/// above `min_sessions`. Active sessions are never touched; close
/// failures are logged and swallowed.
async fn evictor_loop(inner: Arc<PoolInner>) {
    let period = inner.config.idle_timeout;
    log::debug!("evictor task started (period {:?})", period);
    loop {
        if inner.is_shut_down() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = inner.shutdown_notify.notified() => break,
        }
        if inner.is_shut_down() {
            break;
        }

        let mut evicted = Vec::new();
        {
            let mut idle = inner.idle.lock().expect("idle set lock");
            let mut survivors = VecDeque::with_capacity(idle.len());
            while let Some(entry) = idle.pop_front() {
                let aged = entry.last_used.elapsed() > period;
                if aged && inner.total.load(Ordering::SeqCst) > inner.config.min_sessions {
                    inner.total.fetch_sub(1, Ordering::SeqCst);
                    evicted.push(entry.session);
                } else {
                    survivors.push_back(entry);
                }
            }
            *idle = survivors;
        }

        if !evicted.is_empty() {
            log::info!(
                "evicting {} idle session(s), {} remain",
                evicted.len(),
                inner.total.load(Ordering::SeqCst)
            );
            for mut session in evicted {
                session.close().await;
            }
        }
    }
    log::debug!("evictor task exiting");
}

/// The public pool type.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
pub struct ChromePool {
    inner: Arc<PoolInner>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    evictor: Mutex<Option<JoinHandle<()>>>,
}

impl ChromePool {
    /// Create a builder.
    pub fn builder() -> ChromePoolBuilder {
        ChromePoolBuilder::new()
    }

    /// Acquire a session, suspending until one is available or the
    /// acquire timeout expires.
    ///
    /// The returned [`SessionHandle`] releases the session back to the
    /// pool when dropped, on every exit path.
    ///
    /// # Errors
    ///
    /// - [`Html2PdfError::PoolClosed`] after shutdown.
    /// - [`Html2PdfError::AcquireTimeout`] when the wait deadline expires.
    pub async fn acquire(&self) -> Result<SessionHandle> {
        let session = self.inner.acquire_session().await?;
        Ok(SessionHandle::new(session, Arc::clone(&self.inner)))
    }

    /// Pre-create up to `min_sessions` sessions.
    ///
    /// Each creation is capped at thirty seconds; failures are logged
    /// and skipped, so the pool may start partially filled.
    pub async fn prewarm(&self) {
        let target = self.inner.config.min_sessions;
        if target == 0 {
            return;
        }
        log::info!("pre-warming pool with up to {} session(s)", target);

        let mut created = 0usize;
        for attempt in 0..target {
            if self.inner.is_shut_down() {
                break;
            }
            let Some(slot) = self.inner.claim_slot(target) else {
                break;
            };
            match tokio::time::timeout(CREATE_TIMEOUT, self.inner.create_for_slot(slot)).await {
                Ok(Ok(session)) => {
                    created += 1;
                    let mut idle = self.inner.idle.lock().expect("idle set lock");
                    idle.push_back(PooledEntry {
                        session,
                        last_used: Instant::now(),
                    });
                }
                Ok(Err(e)) => {
                    self.inner.total.fetch_sub(1, Ordering::SeqCst);
                    log::error!("pre-warm session {} failed: {}", attempt + 1, e);
                }
                Err(_) => {
                    self.inner.total.fetch_sub(1, Ordering::SeqCst);
                    log::error!(
                        "pre-warm session {} timed out after {:?}",
                        attempt + 1,
                        CREATE_TIMEOUT
                    );
                }
            }
        }
        log::info!("pre-warm finished: {}/{} session(s) created", created, target);
    }

    /// Top the pool up to `min_sessions`, serially, with a short pause
    /// between creations. One bounded pass; failures are logged and
    /// skipped. Intended for background use after a lazily constructed
    /// pool.
    pub async fn ensure_min(&self) {
        let target = self.inner.config.min_sessions;
        if target == 0 || self.inner.is_shut_down() {
            return;
        }
        let current = self.inner.total.load(Ordering::SeqCst);
        if current >= target {
            log::debug!("pool already at minimum ({} >= {})", current, target);
            return;
        }
        log::info!(
            "topping pool up from {} toward minimum of {}",
            current,
            target
        );

        for _ in 0..target {
            if self.inner.is_shut_down() {
                break;
            }
            let Some(slot) = self.inner.claim_slot(target) else {
                break;
            };
            match tokio::time::timeout(CREATE_TIMEOUT, self.inner.create_for_slot(slot)).await {
                Ok(Ok(session)) => {
                    let mut idle = self.inner.idle.lock().expect("idle set lock");
                    idle.push_back(PooledEntry {
                        session,
                        last_used: Instant::now(),
                    });
                }
                Ok(Err(e)) => {
                    self.inner.total.fetch_sub(1, Ordering::SeqCst);
                    log::error!("top-up session creation failed: {}", e);
                }
                Err(_) => {
                    self.inner.total.fetch_sub(1, Ordering::SeqCst);
                    log::error!("top-up session creation timed out");
                }
            }
            tokio::time::sleep(ENSURE_MIN_PAUSE).await;
        }
        log::info!("top-up finished: {}", self.stats());
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.inner.stats()
    }

    /// Shut the pool down.
    ///
    /// Idempotent. Stops the background tasks (bounded join, then
    /// abort), fails every queued waiter with
    /// [`Html2PdfError::PoolClosed`], and closes every idle session.
    /// Sessions checked out at this moment are closed when their
    /// handles release them.
    pub async fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            log::debug!("pool already shut down");
            return;
        }
        log::info!("shutting down pool: {}", self.stats());
        self.inner.shutdown_notify.notify_waiters();

        for slot in [&self.dispatcher, &self.evictor] {
            let handle = slot.lock().expect("task handle lock").take();
            if let Some(handle) = handle {
                let abort = handle.abort_handle();
                if tokio::time::timeout(TASK_JOIN_TIMEOUT, handle).await.is_err() {
                    abort.abort();
                }
            }
        }

        let tickets: Vec<WaitTicket> = {
            let mut waiters = self.inner.waiters.lock().expect("wait queue lock");
            waiters.drain(..).collect()
        };
        if !tickets.is_empty() {
            log::info!("failing {} queued waiter(s)", tickets.len());
        }
        for ticket in tickets {
            let _ = ticket.tx.send(Err(Html2PdfError::PoolClosed));
        }
        self.inner.waiting.store(0, Ordering::SeqCst);

        let entries: Vec<PooledEntry> = {
            let mut idle = self.inner.idle.lock().expect("idle set lock");
            idle.drain(..).collect()
        };
        for entry in entries {
            self.inner.total.fetch_sub(1, Ordering::SeqCst);
            let mut session = entry.session;
            session.close().await;
        }

        log::info!(
            "pool shut down, {} session(s) still checked out",
            self.inner.active.load(Ordering::SeqCst)
        );
    }
}

impl Drop for ChromePool {
    /// Safety net for pools dropped without an explicit shutdown: flag
    /// the pool closed, stop the tasks, fail the waiters, and let the
    /// idle sessions' own `Drop` impls kill their browsers.
    fn drop(&mut self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        log::warn!("ChromePool dropped without shutdown(), cleaning up");

        for slot in [&self.dispatcher, &self.evictor] {
            if let Some(handle) = slot.lock().expect("task handle lock").take() {
                handle.abort();
            }
        }

        let tickets: Vec<WaitTicket> = {
            let mut waiters = self.inner.waiters.lock().expect("wait queue lock");
            waiters.drain(..).collect()
        };
        for ticket in tickets {
            let _ = ticket.tx.send(Err(Html2PdfError::PoolClosed));
        }
        self.inner.waiting.store(0, Ordering::SeqCst);

        let mut idle = self.inner.idle.lock().expect("idle set lock");
        let dropped = idle.len();
        self.inner.total.fetch_sub(dropped, Ordering::SeqCst);
        idle.clear();
    }
}

impl std::fmt::Debug for ChromePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromePool")
            .field("stats", &self.stats())
            .field("shutdown", &self.inner.is_shut_down())
            .finish()
    }
}

/// Builder for [`ChromePool`].
///
/// A factory is optional: without one, a [`ChromeSessionFactory`] is
/// built from the configuration's `chrome_path`.
///
/// # Panics
///
/// `build()` panics if called outside a tokio runtime (the pool spawns
/// its background tasks at construction).
pub struct ChromePoolBuilder {
    config: Option<PoolConfig>,
    factory: Option<Box<dyn SessionFactory>>,
}

impl ChromePoolBuilder {
    /// Create a builder with defaults.
    pub fn new() -> Self {
        Self {
            config: None,
            factory: None,
        }
    }

    /// Use a validated configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom session factory.
    pub fn factory(mut self, factory: Box<dyn SessionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the pool and start its background tasks.
    ///
    /// # Errors
    ///
    /// Currently infallible beyond configuration validation performed by
    /// [`PoolConfigBuilder`](crate::PoolConfigBuilder); kept as a
    /// `Result` so future validation does not break the API.
    pub fn build(self) -> Result<ChromePool> {
        let config = self.config.unwrap_or_default();
        let factory = self
            .factory
            .unwrap_or_else(|| Box::new(ChromeSessionFactory::new(config.chrome_path.clone())));

        log::info!(
            "building pool: min={}, max={}, base_port={}, idle_timeout={:?}, acquire_timeout={:?}",
            config.min_sessions,
            config.max_sessions,
            config.base_port,
            config.idle_timeout,
            config.acquire_timeout
        );

        let inner = Arc::new(PoolInner {
            config,
            factory,
            idle: Mutex::new(VecDeque::new()),
            waiters: Mutex::new(VecDeque::new()),
            total: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            waiting: AtomicUsize::new(0),
            next_ticket_id: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
            shutdown_notify: tokio::sync::Notify::new(),
            runtime: tokio::runtime::Handle::current(),
        });

        let dispatcher = tokio::spawn(dispatcher_loop(Arc::clone(&inner)));
        let evictor = tokio::spawn(evictor_loop(Arc::clone(&inner)));

        Ok(ChromePool {
            inner,
            dispatcher: Mutex::new(Some(dispatcher)),
            evictor: Mutex::new(Some(evictor)),
        })
    }
}

impl Default for ChromePoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfigBuilder;
    use crate::factory::mock::MockSessionFactory;

    fn failing_pool(max: usize, acquire_timeout: Duration) -> (ChromePool, Arc<AtomicUsize>) {
        let factory = MockSessionFactory::always_fails("no browser in tests");
        let counter = factory.counter();
        let pool = ChromePool::builder()
            .config(
                PoolConfigBuilder::new()
                    .min_sessions(0)
                    .max_sessions(max)
                    .acquire_timeout(acquire_timeout)
                    .build()
                    .unwrap(),
            )
            .factory(Box::new(factory))
            .build()
            .unwrap();
        (pool, counter)
    }

    /// A pool whose factory always fails cannot satisfy an acquire; the
    /// caller gets an acquire timeout and the counters return to rest.
    #[tokio::test]
    async fn test_acquire_times_out_when_creation_fails() {
        let (pool, counter) = failing_pool(2, Duration::from_millis(300));

        let result = pool.acquire().await;
        assert!(matches!(result, Err(Html2PdfError::AcquireTimeout(_))));
        assert!(counter.load(Ordering::SeqCst) >= 1, "factory was consulted");

        // Let any in-flight dispatcher attempt settle before reading
        // the counters.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let stats = pool.stats();
        assert_eq!(stats.total, 0, "failed launches must undo the claim");
        assert_eq!(stats.active, 0);
        assert_eq!(stats.waiting, 0, "timed-out ticket must be removed");

        pool.shutdown().await;
    }

    /// Acquire after shutdown fails with PoolClosed without touching the
    /// factory.
    #[tokio::test]
    async fn test_acquire_after_shutdown() {
        let (pool, counter) = failing_pool(2, Duration::from_secs(1));
        pool.shutdown().await;

        let before = counter.load(Ordering::SeqCst);
        let result = pool.acquire().await;
        assert!(matches!(result, Err(Html2PdfError::PoolClosed)));
        assert_eq!(counter.load(Ordering::SeqCst), before);
    }

    /// Shutdown is idempotent.
    #[tokio::test]
    async fn test_shutdown_idempotent() {
        let (pool, _) = failing_pool(1, Duration::from_secs(1));
        pool.shutdown().await;
        pool.shutdown().await;
        pool.shutdown().await;
        assert_eq!(pool.stats().total, 0);
    }

    /// Pre-warm skips factory failures and leaves the pool empty but
    /// consistent.
    #[tokio::test]
    async fn test_prewarm_skips_failures() {
        let factory = MockSessionFactory::always_fails("still no browser");
        let counter = factory.counter();
        let pool = ChromePool::builder()
            .config(
                PoolConfigBuilder::new()
                    .min_sessions(3)
                    .max_sessions(5)
                    .build()
                    .unwrap(),
            )
            .factory(Box::new(factory))
            .build()
            .unwrap();

        pool.prewarm().await;

        assert_eq!(counter.load(Ordering::SeqCst), 3, "one attempt per slot");
        let stats = pool.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.idle, 0);

        pool.shutdown().await;
    }

    /// The builder defaults to a Chrome factory when none is given.
    #[tokio::test]
    async fn test_builder_defaults() {
        let pool = ChromePool::builder().build().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.waiting, 0);
        pool.shutdown().await;
    }
}
