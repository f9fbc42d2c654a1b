//! Connection factory seam.
//!
//! The pool never opens connections itself; it delegates to a
//! [`ConnectFactory`] supplied at construction. The factory is expected to
//! bind every connection it hands out to one shared embedded database
//! instance. Shutting that database down is the owning process's job, not
//! the pool's.

use async_trait::async_trait;

/// Asynchronous factory for connections to the shared embedded database.
///
/// The pool treats connections as opaque and interchangeable apart from
/// identity: it tracks which ones it owns, never inspects them, and never
/// issues queries. A connection is disposed of by dropping it.
#[async_trait]
pub trait ConnectFactory: Send + Sync + 'static {
    /// Handle for issuing queries against the shared database instance.
    ///
    /// Not assumed safe for concurrent use by two operations at once; the
    /// pool's exclusivity guarantee is what enforces single-holder access.
    type Connection: Send + 'static;

    /// Engine-specific connection failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new connection.
    ///
    /// `threads_per_conn` is an optional hint for the engine's
    /// per-connection query execution concurrency; `None` leaves the
    /// engine default.
    async fn connect(
        &self,
        threads_per_conn: Option<u32>,
    ) -> Result<Self::Connection, Self::Error>;
}
