//! Tracing and logging setup shared by the binary and tests.

/// Initialize process-wide logging from the given settings.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(config: &LoggingConfig) {
    tracing::init(config);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{LogFormat, LoggingConfig};
