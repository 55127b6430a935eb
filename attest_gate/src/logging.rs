// src/logging.rs
// Process-wide tracing subscriber. `log` records (config validation) are
// bridged into it through tracing-subscriber's default `tracing-log` feature.

use std::str::FromStr;
use tracing::Level;

/// Install a fmt subscriber at `level` ("trace" .. "error"). Unknown levels
/// fall back to info. Returns false if a global subscriber already existed.
pub fn init(level: &str) -> bool {
    let level = Level::from_str(level.trim()).unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}
