//! CLI configuration: a thin wrapper around `syncboard_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--config, --data, --output, --color).

use std::path::PathBuf;

use clap::ValueEnum;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use syncboard_config::{Config, config_path, load_config_from, save_config_to};

/// Config file in effect: `--config` / `SYNCBOARD_CONFIG`, else the
/// platform default.
pub fn resolved_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<(Config, PathBuf), CliError> {
    let path = resolved_config_path(global);
    let cfg = load_config_from(&path)?;
    Ok((cfg, path))
}

/// Data file in effect: `--data` / `SYNCBOARD_DATA`, else the config.
pub fn data_path(global: &GlobalOpts, cfg: &Config, config_file: &std::path::Path) -> PathBuf {
    global
        .data
        .clone()
        .unwrap_or_else(|| cfg.data_path(config_file))
}

/// Output format: flag > env > config default.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global
        .output
        .or_else(|| OutputFormat::from_str(&cfg.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table)
}

pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> ColorMode {
    global
        .color
        .or_else(|| ColorMode::from_str(&cfg.defaults.color, true).ok())
        .unwrap_or(ColorMode::Auto)
}
