//! # lbug-pool
//!
//! Bounded, FIFO-fair connection pool for the Ladybug embedded graph
//! database.
//!
//! Ladybug connections are bound to one shared database instance, are
//! comparatively expensive to open, and are not safe for concurrent use by
//! two operations at once. The pool opens a fixed set of connections up
//! front and mediates all access to them:
//!
//! - **Bounded**: exactly `capacity` connections exist, opened eagerly by
//!   [`Pool::init`] and owned by the pool for its whole life.
//! - **Exclusive**: a checked-out connection is held by exactly one caller,
//!   enforced by the [`PooledConnection`] guard owning it by value.
//! - **Fair**: when the pool is exhausted, acquirers queue in strict FIFO
//!   order and each release hands its connection to the head waiter
//!   directly.
//! - **Scoped**: [`Pool::with_connection`] is the sanctioned way for
//!   application code to run queries; release is guaranteed on every exit
//!   path.
//!
//! The pool never opens connections itself. That is delegated to a
//! [`ConnectFactory`], the seam to the embedded engine; the engine's own
//! shutdown stays the owning process's responsibility.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lbug_pool::{Pool, PoolConfig};
//!
//! let pool = Pool::new(PoolConfig::from_env()?, factory)?;
//! pool.init().await?;
//!
//! let people = pool
//!     .with_connection(|conn| async move {
//!         conn.query("MATCH (p:Person) RETURN p.name").await
//!     })
//!     .await?;
//!
//! pool.close();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod factory;
pub mod pool;

pub use config::PoolConfig;
pub use error::PoolError;
pub use factory::ConnectFactory;
pub use pool::{Pool, PoolStatus, PooledConnection};
