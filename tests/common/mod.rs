// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

pub use depwatch_test_utils::builders;
pub use depwatch_test_utils::fakes;
pub use depwatch_test_utils::{TestResult, init_tracing, with_timeout};

/// Absolute test path under a fixed fake project root.
pub fn project_path(rel: &str) -> String {
    format!("/project/{rel}")
}
