//! Loading and saving the TOML config file.
//!
//! - Missing file: `load_or_create` writes the defaults
//! - Unknown sections or missing keys: the file is rewritten cleaned up
//! - Writes go through a temp file and a rename
//! - `ALIGN_*` environment variables override the file in memory only

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::DocumentMut;

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config is not valid TOML: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// The config file and the settings read from it.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Manager for `config_path` holding the defaults; nothing is read yet.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Read an existing file as is.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Read the file, writing the defaults first if it is missing.
    ///
    /// A file with unknown sections or missing keys is rewritten in the
    /// canonical layout.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            tracing::info!("Writing default config to {}", self.config_path.display());
            self.settings = Settings::default();
            return self.save();
        }

        let content = fs::read_to_string(&self.config_path)?;
        let (settings, needs_rewrite) = parse_and_check(&content)?;
        self.settings = settings;

        if needs_rewrite {
            tracing::info!("Cleaning up config {}", self.config_path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Apply `ALIGN_*` environment overrides to the in-memory settings.
    ///
    /// Overrides are never written back to the file.
    pub fn apply_env_overrides(&mut self) {
        let applied = self
            .settings
            .apply_env_overrides(|name| std::env::var(name).ok());
        for name in applied {
            tracing::debug!("Config override from environment: {}", name);
        }
    }

    /// Root of `jobs/`, `uploads/` and `results/`.
    pub fn media_root(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.media_root)
    }

    /// Folder for the daily rolling log.
    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Write every section, each under a short comment.
    pub fn save(&self) -> ConfigResult<()> {
        let mut output = String::from("# First-anchor alignment configuration\n");

        for section in ConfigSection::all() {
            let comment = match section {
                ConfigSection::Paths => "# Media root (jobs/, uploads/, results/) and log folder",
                ConfigSection::Logging => "# Logging configuration",
                ConfigSection::Alignment => "# Default alignment parameters",
                ConfigSection::Retention => "# Job and raw upload retention (days)",
            };
            output.push('\n');
            output.push_str(comment);
            output.push('\n');
            output.push_str(&format!("[{}]\n", section.table_name()));
            output.push_str(&section_toml(&self.settings, section)?);
        }

        self.atomic_write(&output)?;
        Ok(())
    }

    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)
    }
}

/// One section's keys, without the table header.
fn section_toml(settings: &Settings, section: ConfigSection) -> ConfigResult<String> {
    let content = match section {
        ConfigSection::Paths => toml::to_string_pretty(&settings.paths)?,
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
        ConfigSection::Alignment => toml::to_string_pretty(&settings.alignment)?,
        ConfigSection::Retention => toml::to_string_pretty(&settings.retention)?,
    };
    Ok(content)
}

/// Parse settings and report whether the file should be rewritten.
///
/// It should when a top-level table is not a known section, or when a
/// section lacks keys that now fall back to defaults.
fn parse_and_check(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;
    let settings: Settings = toml::from_str(content)?;

    let unknown: Vec<&str> = doc
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !ConfigSection::all().iter().any(|s| s.table_name() == *key))
        .collect();
    for key in &unknown {
        tracing::warn!("Dropping unknown config section [{}]", key);
    }

    let mut missing_keys = false;
    for section in ConfigSection::all() {
        let present = doc.get(section.table_name()).and_then(|item| item.as_table());
        let defaults: toml::Table = toml::from_str(&section_toml(&settings, section)?)?;
        missing_keys |= defaults
            .keys()
            .any(|key| !present.is_some_and(|table| table.contains_key(key)));
    }

    Ok((settings, !unknown.is_empty() || missing_keys))
}
