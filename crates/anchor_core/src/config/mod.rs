//! Configuration management.
//!
//! - TOML file with `[paths]`, `[logging]`, `[alignment]` and `[retention]`
//! - Atomic file writes (write to temp, then rename)
//! - `ALIGN_*` environment overrides layered on top of the file
//!
//! # Example
//!
//! ```no_run
//! use anchor_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new(".config/first-anchor.toml");
//! config.load_or_create().unwrap();
//! config.apply_env_overrides();
//!
//! println!("Media root: {}", config.media_root().display());
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, LoggingSettings, PathSettings, RetentionSettings, Settings,
    ENV_JOB_RETENTION_DAYS, ENV_MEDIA_ROOT, ENV_RAW_AUDIO_ONLY_DAYS,
};
