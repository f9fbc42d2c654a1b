//! Pool warm-up and contention example.
//!
//! Demonstrates eager warm-up, scoped acquisition, FIFO queueing under
//! contention, and shutdown, using the in-memory factory from
//! `lbug-testing` in place of a real database engine.
//!
//! # Running
//!
//! ```bash
//! cargo run -p lbug-pool --example pool_warmup
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use lbug_pool::{Pool, PoolConfig, PoolError};
use lbug_testing::MockFactory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Connection Pool Example ===\n");

    let config = PoolConfig::from_env()?.threads_per_conn(2);
    println!("Pool configuration:");
    println!("  Capacity: {}", config.capacity);
    println!("  Threads per connection: {:?}", config.threads_per_conn);
    println!();

    let factory = MockFactory::new().with_connect_delay(Duration::from_millis(50));
    let pool = Pool::new(config, factory.clone())?;

    // Example 1: eager warm-up
    println!("1. Warming up...");
    pool.init().await?;
    println!(
        "  Opened {} connections ({} live handles)\n",
        pool.status().available,
        factory.live_count()
    );

    // Example 2: scoped acquisition
    println!("2. Scoped acquisition:");
    let id = pool
        .with_connection(|conn| async move { Ok::<_, PoolError>(conn.id()) })
        .await?;
    println!("  Ran an operation on connection {id}\n");

    // Example 3: contention (3x capacity concurrent holders)
    let workers = pool.status().capacity * 3;
    println!("3. Contention ({workers} workers):");
    let mut handles = Vec::new();
    for worker in 0..workers {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            pool.with_connection(|conn| async move {
                // Simulate some query work
                tokio::time::sleep(Duration::from_millis(20)).await;
                println!("  worker {worker} ran on connection {}", conn.id());
                Ok::<_, PoolError>(())
            })
            .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let status = pool.status();
    println!(
        "\n  After contention: {}/{} available, {} connections ever opened",
        status.available,
        status.capacity,
        factory.connect_count()
    );

    // Example 4: shutdown
    println!("\n4. Shutdown:");
    pool.close();
    println!("  Pool closed; {} live handles remain", factory.live_count());

    match pool.acquire().await {
        Err(PoolError::Closed) => println!("  Acquire after close is rejected"),
        Err(other) => println!("  Unexpected error: {other}"),
        Ok(_) => println!("  Unexpected: acquire succeeded"),
    }

    Ok(())
}
