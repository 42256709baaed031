//! Shared helpers for depwatch's integration tests.
//!
//! - [`builders`]: fluent construction of validated configs.
//! - [`fakes`]: in-memory bundler, watch backend and file list that record
//!   what the runtime asks of them.

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static INIT: Once = Once::new();

/// Initialise tracing once per test binary.
///
/// Output goes through the test writer, so it only shows up for failing
/// tests (or with `-- --nocapture`). The filter is read from `DEPWATCH_LOG`,
/// falling back to `RUST_LOG` and then `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("DEPWATCH_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
