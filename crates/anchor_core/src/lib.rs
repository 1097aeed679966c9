//! Anchor Core - first-anchor audio alignment
//!
//! Estimates the offset between an in-house recording and an external
//! recording of the same event, and turns it into an FFmpeg command that
//! shifts one of them onto the other's timeline. No UI or HTTP dependencies;
//! the CLI and any service wrap this crate.

pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod shift;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
