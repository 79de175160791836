//! Shared test setup.
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     // ...
//! }
//! ```
//!
//! Log output is controlled by `RUST_LOG` and only produced when the crate
//! is built with the `tracing` feature:
//!
//! ```bash
//! RUST_LOG=pathtrie=trace cargo test --features tracing -- --nocapture
//! ```

#![allow(dead_code)]

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Ensures tracing is only initialized once across all tests.
static INIT: Once = Once::new();

/// Installs a console subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_ids(true)
            .try_init();
    });
}

/// Collects the ids attached to `leaf` in ascending order.
pub fn ids(leaf: &pathtrie::Leaf) -> Vec<u64> {
    let mut output = Vec::new();
    leaf.append_to(&mut output);
    output
}
