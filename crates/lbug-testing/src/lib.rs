//! # lbug-testing
//!
//! Test infrastructure for lbug-pool development.
//!
//! This crate provides an in-memory connection factory so pool behavior can
//! be exercised without a real database engine: scripted connect failures,
//! connect-attempt counting, and live-handle tracking for asserting that
//! connections are disposed of when they should be.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lbug_pool::{Pool, PoolConfig};
//! use lbug_testing::MockFactory;
//!
//! #[tokio::test]
//! async fn test_warm_up() {
//!     let factory = MockFactory::new();
//!     let pool = Pool::new(PoolConfig::new().capacity(2), factory.clone()).unwrap();
//!
//!     pool.init().await.unwrap();
//!     assert_eq!(factory.connect_count(), 2);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod factory;

pub use factory::{MockConnection, MockConnectError, MockFactory};
