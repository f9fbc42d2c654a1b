//! In-memory connection factory with scripted failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lbug_pool::ConnectFactory;
use parking_lot::Mutex;
use thiserror::Error;

/// Error produced by a scripted [`MockFactory`] failure.
#[derive(Debug, Clone, Error)]
#[error("mock connect failure on attempt {attempt}")]
pub struct MockConnectError {
    /// 1-based connect attempt that was scripted to fail.
    pub attempt: u32,
}

/// A connection handle produced by [`MockFactory`].
///
/// Carries a unique id so tests can assert on connection identity, and
/// decrements the factory's live-handle count when dropped.
#[derive(Debug)]
pub struct MockConnection {
    id: u64,
    threads_per_conn: Option<u32>,
    shared: Arc<Shared>,
}

impl MockConnection {
    /// Unique id of this connection, in creation order starting at 1.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The concurrency hint the factory was given for this connection.
    #[must_use]
    pub fn threads_per_conn(&self) -> Option<u32> {
        self.threads_per_conn
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct Shared {
    next_id: AtomicU64,
    connects: AtomicU32,
    live: AtomicU32,
    fail_on: Mutex<Vec<u32>>,
    connect_delay: Mutex<Option<Duration>>,
}

/// In-memory connection factory.
///
/// Clones share the same counters and failure script, so a test can keep a
/// clone for assertions after handing the factory to a pool.
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    shared: Arc<Shared>,
}

impl MockFactory {
    /// Create a factory where every connect succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory whose given 1-based connect attempts fail.
    #[must_use]
    pub fn failing_on(attempts: impl IntoIterator<Item = u32>) -> Self {
        let factory = Self::new();
        *factory.shared.fail_on.lock() = attempts.into_iter().collect();
        factory
    }

    /// Delay every connect by `delay`, to widen race windows in tests.
    #[must_use]
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        *self.shared.connect_delay.lock() = Some(delay);
        self
    }

    /// Total connect attempts made, successful or not.
    #[must_use]
    pub fn connect_count(&self) -> u32 {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Connections handed out and not yet dropped.
    #[must_use]
    pub fn live_count(&self) -> u32 {
        self.shared.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectFactory for MockFactory {
    type Connection = MockConnection;
    type Error = MockConnectError;

    async fn connect(
        &self,
        threads_per_conn: Option<u32>,
    ) -> Result<Self::Connection, Self::Error> {
        let attempt = self.shared.connects.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = *self.shared.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.shared.fail_on.lock().contains(&attempt) {
            return Err(MockConnectError { attempt });
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            id,
            threads_per_conn,
            shared: Arc::clone(&self.shared),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let factory = MockFactory::new();
        let a = factory.connect(None).await.unwrap();
        let b = factory.connect(None).await.unwrap();

        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert_eq!(factory.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_live_count_tracks_drops() {
        let factory = MockFactory::new();
        let conn = factory.connect(None).await.unwrap();
        assert_eq!(factory.live_count(), 1);

        drop(conn);
        assert_eq!(factory.live_count(), 0);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let factory = MockFactory::failing_on([2]);

        // Keep the successful connections bound so they stay live
        let first = factory.connect(None).await.unwrap();
        let err = factory.connect(None).await.unwrap_err();
        assert_eq!(err.attempt, 2);

        // Failed attempts still count; the script is per-attempt, not per-success
        let third = factory.connect(None).await.unwrap();
        assert_eq!(factory.connect_count(), 3);
        assert_eq!(factory.live_count(), 2);

        drop(first);
        drop(third);
        assert_eq!(factory.live_count(), 0);
    }

    #[tokio::test]
    async fn test_threads_hint_is_recorded() {
        let factory = MockFactory::new();
        let conn = factory.connect(Some(2)).await.unwrap();
        assert_eq!(conn.threads_per_conn(), Some(2));
    }
}
