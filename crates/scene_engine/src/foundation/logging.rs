//! Logging utilities
//!
//! The engine logs through the `log` facade; the host decides whether and how
//! the records are printed by calling one of the initialisers below once.

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from the `RUST_LOG` environment variable
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a filter string such as `"info"` or
/// `"scene_engine=trace"`
///
/// `RUST_LOG` still takes precedence when it is set. Calling this more than
/// once is harmless; later calls are ignored.
pub fn init_with_level(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    if builder.try_init().is_err() {
        log::debug!("Logger already initialised, ignoring level {level}");
    }
}
