//! Logging setup for the repbook binary.
//!
//! Log lines go to stderr so session prompts and command output on stdout
//! stay clean. `RUST_LOG` always wins over the level passed in.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Quiet default: warnings (corrupt files, torn log lines) and errors only
pub fn init() {
    init_with_level("warn")
}

/// Initialize with `default_level` (debug, info, warn, error) unless
/// `RUST_LOG` is set
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Route session engine logs into the test harness output
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("repbook_core=debug"))
        .try_init();
}
