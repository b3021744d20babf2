//! Config command handlers. These never open the data file.

use std::path::PathBuf;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let (cfg, path) = config::load(global)?;
            let format = config::output_format(global, &cfg);
            let out = output::render_single(
                format,
                &cfg,
                |c| {
                    format!(
                        "{c:#?}\n\nconfig file: {}\ndata file:   {}",
                        path.display(),
                        config::data_path(global, c, &path).display()
                    )
                },
                |_| path.display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let path = config::resolved_config_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let (mut cfg, path) = config::load(global)?;
            set_key(&mut cfg, &key, &value)?;
            config::save_config_to(&cfg, &path)?;
            if !global.quiet {
                eprintln!("Set {key} = {value}");
            }
            Ok(())
        }
    }
}

fn set_key(cfg: &mut Config, key: &str, value: &str) -> Result<(), CliError> {
    match key {
        "data_file" => cfg.data_file = Some(PathBuf::from(value)),
        "defaults.output" => cfg.defaults.output = value.to_owned(),
        "defaults.color" => cfg.defaults.color = value.to_owned(),
        "sync.refresh_interval_secs" => {
            cfg.sync.refresh_interval_secs = value.parse().map_err(|_| CliError::Validation {
                field: key.into(),
                reason: format!("expected a whole number of seconds, got '{value}'"),
            })?;
        }
        "sync.load_on_start" => {
            cfg.sync.load_on_start = value.parse().map_err(|_| CliError::Validation {
                field: key.into(),
                reason: format!("expected true or false, got '{value}'"),
            })?;
        }
        other => {
            return Err(CliError::Validation {
                field: "key".into(),
                reason: format!(
                    "unknown key '{other}' (expected data_file, defaults.output, defaults.color, \
                     sync.refresh_interval_secs, or sync.load_on_start)"
                ),
            });
        }
    }
    cfg.validate()?;
    Ok(())
}
