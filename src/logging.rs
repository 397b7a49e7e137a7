//! Subscriber setup for hosts that don't install their own.

use tracing_subscriber::{EnvFilter, fmt};

/// Install a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_directive` (e.g. `"paddock=info"`) when the variable is unset
/// or invalid. Returns `false` if a global subscriber already exists.
pub fn init_logging(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).try_init().is_ok()
}
