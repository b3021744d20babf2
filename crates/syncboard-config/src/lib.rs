//! Shared configuration for syncboard tools.
//!
//! One TOML file plus `SYNCBOARD_` environment overrides, layered with
//! figment, and translation to `syncboard_core::SyncConfig`. The CLI adds
//! flag-aware wrappers on top.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use syncboard_core::SyncConfig;

/// Environment prefix for overrides. Nested keys use `__`, e.g.
/// `SYNCBOARD_DEFAULTS__OUTPUT=json`.
pub const ENV_PREFIX: &str = "SYNCBOARD_";

const OUTPUT_FORMATS: &[&str] = &["table", "json", "json-compact", "yaml", "plain"];
const COLOR_MODES: &[&str] = &["auto", "always", "never"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// JSON file backing the local store. Relative paths resolve against
    /// the directory of the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,

    /// Output defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Background sync settings.
    #[serde(default)]
    pub sync: SyncSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncSection {
    /// Seconds between background reloads; `0` disables them.
    #[serde(default)]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_true")]
    pub load_on_start: bool,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 0,
            load_on_start: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Check enumerated string fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_one_of("defaults.output", &self.defaults.output, OUTPUT_FORMATS)?;
        check_one_of("defaults.color", &self.defaults.color, COLOR_MODES)?;
        Ok(())
    }

    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            refresh_interval_secs: self.sync.refresh_interval_secs,
            load_on_start: self.sync.load_on_start,
        }
    }

    /// Where the data file lives, given the config file it was read from.
    pub fn data_path(&self, config_file: &Path) -> PathBuf {
        match &self.data_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_file
                .parent()
                .map_or_else(|| path.clone(), |dir| dir.join(path)),
            None => default_data_path(),
        }
    }
}

fn check_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected one of {}, got '{value}'", allowed.join(", ")),
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "syncboard", "syncboard")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the data file when the config names none.
pub fn default_data_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback().join("data.json"),
        |dirs| dirs.data_dir().join("data.json"),
    )
}

fn home_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("syncboard");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
