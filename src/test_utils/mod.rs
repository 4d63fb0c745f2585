//! Test utilities for forge
//!
//! Helpers shared by unit tests and the integration suite:
//! - one-time tracing setup ([`init_test_logging`])
//! - in-process package archives ([`PackageFixture`])
//! - a temporary home with a registry and project root ([`TestHome`])
//!
//! Available under `cfg(test)` and with the `test-utils` feature.

pub mod fixtures;

pub use fixtures::{PackageFixture, TestHome};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` set that level is used;
/// otherwise `RUST_LOG` is honored, and without either nothing is logged.
///
/// ```bash
/// RUST_LOG=forge_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
