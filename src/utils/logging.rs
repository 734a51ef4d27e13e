//! Logging utilities
//!
//! Provides logging setup and configuration.

use env_logger::Env;

/// Setup logging for the client.
///
/// Honors `RUST_LOG`; defaults to `warn` so protocol chatter stays off the
/// interactive prompt.
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
}
