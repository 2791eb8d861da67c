//! Logging utilities and structured logging support
//!
//! The library itself only talks to the `log` facade. Binaries decide whether
//! and how a logger is installed.

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a default filter
///
/// `RUST_LOG` still wins when it is set. Returns `false` when a logger was
/// already installed, which happens routinely in tests.
pub fn init_with_filter(default_filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init()
        .is_ok()
}

/// Install a test logger, ignoring repeated calls
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
