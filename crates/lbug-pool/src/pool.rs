//! Connection pool implementation.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio::sync::oneshot;

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::factory::ConnectFactory;

/// A bounded connection pool for the embedded graph database.
///
/// The pool opens a fixed set of connections up front (see [`Pool::init`])
/// and hands them out one holder at a time. When every connection is checked
/// out, acquirers queue in strict FIFO order and are woken directly by
/// releases; a released connection goes to the head waiter without touching
/// the idle set.
///
/// `Pool` is a cheap handle: clones share the same state, so it can be
/// passed to whatever needs it instead of living in a global.
pub struct Pool<F: ConnectFactory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ConnectFactory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PoolInner<F: ConnectFactory> {
    config: PoolConfig,
    factory: F,
    /// Memoized warm-up outcome: one attempt, one result, observed by every
    /// caller that awaits it.
    warm_up: OnceCell<Result<(), PoolError>>,
    state: Mutex<PoolState<F>>,
}

/// Mutable pool state. Every transition happens under the one lock, with no
/// await while it is held, so each transition is atomic with respect to the
/// others.
struct PoolState<F: ConnectFactory> {
    /// Connections currently available for checkout. `idle.len()` never
    /// exceeds the configured capacity.
    idle: Vec<F::Connection>,

    /// Pending acquisitions in arrival order. A dropped receiver (deadline
    /// elapsed, future cancelled) leaves a dead sender behind; it is
    /// discarded the next time a release walks the queue.
    ///
    /// The channel carries the guard rather than the bare connection: a
    /// hand-off abandoned between send and receive rides back to the pool
    /// through the guard's drop instead of being lost.
    waiters: VecDeque<oneshot::Sender<PooledConnection<F>>>,

    /// Connections currently checked out to a holder.
    in_use: u32,

    /// Terminal; never reset.
    closed: bool,
}

impl<F: ConnectFactory> Pool<F> {
    /// Create a pool from a validated configuration and a connection
    /// factory.
    ///
    /// Fails fast with [`PoolError::Configuration`] if the capacity is
    /// zero. No connection is opened here; that happens in [`Pool::init`].
    pub fn new(config: PoolConfig, factory: F) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                warm_up: OnceCell::new(),
                state: Mutex::new(PoolState {
                    idle: Vec::with_capacity(config.capacity as usize),
                    waiters: VecDeque::new(),
                    in_use: 0,
                    closed: false,
                }),
                config,
                factory,
            }),
        })
    }

    /// Pre-open `capacity` connections so first acquisitions are fast.
    ///
    /// The warm-up runs at most once per pool: concurrent and repeated
    /// calls all await the same attempt and observe its single outcome.
    /// On a factory failure partway through, every connection opened so
    /// far is dropped before [`PoolError::Init`] is surfaced, and later
    /// calls re-surface the same error without retrying.
    pub async fn init(&self) -> Result<(), PoolError> {
        self.inner.ensure_warm().await
    }

    /// Acquire a connection, waiting with the configured default deadline
    /// (indefinitely when none is configured).
    ///
    /// If an idle connection exists it is returned without suspending.
    /// Otherwise the caller queues at the FIFO tail and suspends until a
    /// release hands it a connection directly; waiters are satisfied in
    /// strict arrival order regardless of release timing.
    ///
    /// Fails immediately with [`PoolError::Closed`] after [`Pool::close`],
    /// without queueing.
    pub async fn acquire(&self) -> Result<PooledConnection<F>, PoolError> {
        self.acquire_inner(self.inner.config.acquire_timeout).await
    }

    /// Acquire with an explicit deadline, overriding the configured
    /// default.
    ///
    /// If the deadline elapses while queued, the acquisition fails with
    /// [`PoolError::AcquireTimeout`] and the abandoned queue slot is
    /// discarded by a later release; other waiters keep their order.
    pub async fn acquire_timeout(
        &self,
        deadline: Duration,
    ) -> Result<PooledConnection<F>, PoolError> {
        self.acquire_inner(Some(deadline)).await
    }

    async fn acquire_inner(
        &self,
        deadline: Option<Duration>,
    ) -> Result<PooledConnection<F>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        self.inner.ensure_warm().await?;

        let mut rx = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }
            if let Some(conn) = state.idle.pop() {
                state.in_use += 1;
                tracing::trace!(available = state.idle.len(), "acquired idle connection");
                return Ok(PooledConnection::new(conn, Arc::clone(&self.inner)));
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::trace!(
                waiters = state.waiters.len(),
                "pool exhausted, queued waiter"
            );
            rx
        };

        // A dropped sender means the pool was closed out from under us; a
        // release never discards a waiter whose receiver is still alive.
        let guard = match deadline {
            None => (&mut rx).await.map_err(|_| PoolError::Closed)?,
            Some(deadline) => match tokio::time::timeout(deadline, &mut rx).await {
                Ok(Ok(guard)) => guard,
                Ok(Err(_)) => return Err(PoolError::Closed),
                Err(_) => {
                    // Refuse a late hand-off before checking for one that
                    // already happened, so the two can't interleave.
                    rx.close();
                    match rx.try_recv() {
                        // The hand-off raced the deadline and won; keep it.
                        Ok(guard) => guard,
                        Err(_) => {
                            tracing::trace!(?deadline, "acquire deadline elapsed while queued");
                            return Err(PoolError::AcquireTimeout(deadline));
                        }
                    }
                }
            },
        };

        tracing::trace!("acquired connection from release hand-off");
        Ok(guard)
    }

    /// Acquire a connection, run `op` with it, and release it on every
    /// exit path.
    ///
    /// This is the sanctioned way for application code to touch a
    /// connection: the guard handed to `op` returns the connection to the
    /// pool when dropped, whether `op` returns, fails, or is cancelled.
    /// A failure from `op` is passed through unchanged; release still
    /// happens first.
    pub async fn with_connection<Op, Fut, T, E>(&self, op: Op) -> Result<T, E>
    where
        Op: FnOnce(PooledConnection<F>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<PoolError>,
    {
        let conn = self.acquire().await?;
        op(conn).await
    }

    /// Close the pool.
    ///
    /// Idempotent; the first call transitions the pool to its terminal
    /// closed state, later calls are no-ops. Every queued waiter is
    /// resolved with [`PoolError::Closed`] and the idle connections are
    /// dropped. Holders of already-checked-out connections are not
    /// interrupted; their connections are dropped on release. The
    /// underlying database is not shut down here.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;

        // Dropping the senders resolves every queued receiver with Closed.
        let rejected = state.waiters.len();
        state.waiters.clear();

        let dropped = state.idle.len();
        state.idle.clear();

        tracing::info!(
            rejected_waiters = rejected,
            dropped_idle = dropped,
            "connection pool closed"
        );
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock();
        PoolStatus {
            available: state.idle.len() as u32,
            in_use: state.in_use,
            waiters: state.waiters.len() as u32,
            capacity: self.inner.config.capacity,
        }
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl<F: ConnectFactory> fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Pool")
            .field("capacity", &self.inner.config.capacity)
            .field("available", &state.idle.len())
            .field("in_use", &state.in_use)
            .field("waiters", &state.waiters.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<F: ConnectFactory> PoolInner<F> {
    async fn ensure_warm(&self) -> Result<(), PoolError> {
        self.warm_up
            .get_or_init(|| self.warm_up_once())
            .await
            .clone()
    }

    /// Open `capacity` connections sequentially through the factory.
    /// Runs under the `warm_up` cell, so at most once per pool.
    async fn warm_up_once(&self) -> Result<(), PoolError> {
        if self.state.lock().closed {
            return Err(PoolError::Closed);
        }

        let capacity = self.config.capacity;
        let mut opened = Vec::with_capacity(capacity as usize);
        for n in 1..=capacity {
            match self.factory.connect(self.config.threads_per_conn).await {
                Ok(conn) => {
                    tracing::debug!(connection = n, capacity, "opened connection");
                    opened.push(conn);
                }
                Err(error) => {
                    tracing::warn!(
                        %error,
                        connection = n,
                        capacity,
                        "warm-up failed, dropping connections opened so far"
                    );
                    drop(opened);
                    return Err(PoolError::Init(Arc::new(error)));
                }
            }
        }

        let mut state = self.state.lock();
        if state.closed {
            // Closed while warming up; `opened` is dropped on return.
            return Err(PoolError::Closed);
        }
        state.idle = opened;
        tracing::debug!(capacity, "pool warmed up");
        Ok(())
    }

    /// Return a checked-out connection to the pool.
    ///
    /// The head live waiter gets the connection directly, which is what
    /// keeps releases O(1) and FIFO order intact without a wake-and-recheck
    /// step. Dead waiters at the head are discarded. With no waiters the
    /// connection rejoins the idle set; after close it is dropped.
    fn release(self: &Arc<Self>, conn: F::Connection) {
        let mut state = self.state.lock();
        if state.closed {
            state.in_use = state.in_use.saturating_sub(1);
            tracing::trace!("released into closed pool, dropping connection");
            return;
        }

        let mut conn = conn;
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(PooledConnection::new(conn, Arc::clone(self))) {
                Ok(()) => {
                    tracing::trace!(
                        waiters = state.waiters.len(),
                        "handed connection to queued waiter"
                    );
                    return;
                }
                // Receiver gone: that acquisition timed out or was
                // cancelled. Reclaim the connection and try the next.
                Err(returned) => conn = returned.take_conn(),
            }
        }

        state.in_use -= 1;
        state.idle.push(conn);
        tracing::trace!(available = state.idle.len(), "returned connection to idle set");
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of connections currently checked out.
    pub in_use: u32,
    /// Number of acquisitions queued behind the current holders.
    pub waiters: u32,
    /// Fixed number of connections the pool owns once warmed up.
    pub capacity: u32,
}

/// A connection checked out of the pool.
///
/// Dereferences to the underlying connection. Dropping the guard releases
/// it: the head queued waiter is woken with the connection if one is
/// waiting, otherwise it rejoins the idle set; if the pool was closed in
/// the meantime the connection is dropped instead. Release happening
/// exactly once, on drop, is what makes double-release and foreign-release
/// unrepresentable.
pub struct PooledConnection<F: ConnectFactory> {
    conn: Option<F::Connection>,
    pool: Arc<PoolInner<F>>,
}

impl<F: ConnectFactory> PooledConnection<F> {
    fn new(conn: F::Connection, pool: Arc<PoolInner<F>>) -> Self {
        Self {
            conn: Some(conn),
            pool,
        }
    }

    /// Take the connection out without releasing it, leaving the guard
    /// inert for its drop.
    #[allow(clippy::unwrap_used)]
    fn take_conn(mut self) -> F::Connection {
        self.conn.take().unwrap()
    }
}

impl<F: ConnectFactory> Deref for PooledConnection<F> {
    type Target = F::Connection;

    // Invariant: `conn` is only taken in `drop`.
    #[allow(clippy::unwrap_used)]
    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().unwrap()
    }
}

impl<F: ConnectFactory> DerefMut for PooledConnection<F> {
    #[allow(clippy::unwrap_used)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().unwrap()
    }
}

impl<F: ConnectFactory> fmt::Debug for PooledConnection<F>
where
    F::Connection: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledConnection").field(&self.conn).finish()
    }
}

impl<F: ConnectFactory> Drop for PooledConnection<F> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
