//! Pool error types.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during pool operations.
///
/// The enum is `Clone` so that the single memoized warm-up outcome can be
/// handed to every caller that awaits it.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Pool configuration error.
    #[error("pool configuration error: {0}")]
    Configuration(String),

    /// The connection factory failed during warm-up.
    ///
    /// Surfaced by `init` and by every later call that awaits the same
    /// warm-up attempt; the warm-up is never retried.
    #[error("pool warm-up failed: {0}")]
    Init(#[source] Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// Pool is closed.
    #[error("pool is closed")]
    Closed,

    /// A queued acquisition was not satisfied within its deadline.
    #[error("connection acquisition timed out after {0:?}")]
    AcquireTimeout(Duration),
}
