//! Test log output
//!
//! Installs a global `tracing` subscriber once per test binary. The filter
//! comes from `RUST_LOG` and defaults to `bearer_gate=debug`; output goes
//! through the test writer so it is captured per test.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the test subscriber; later calls are no-ops.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("bearer_gate=debug"));
        // Another harness may already own the global subscriber
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
