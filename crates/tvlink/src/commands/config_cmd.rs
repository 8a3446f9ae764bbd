//! Config subcommand handlers.

use tvlink_config::{Config, save_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::{config_path, resolve};
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { host, name, force } => {
            let path = config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut config = Config {
                host: Some(host),
                secure: global.secure,
                ..Config::default()
            };
            if let Some(name) = name {
                config.name = name;
            }

            save_config(&config, &path)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        }

        ConfigCommand::Show => {
            let resolved = resolve(global)?;
            let toml_str = toml::to_string_pretty(&resolved.config).map_err(|e| CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            })?;
            print!("{toml_str}");
            println!("# pairing key: {}", resolved.config.key_path().display());
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config_path(global).display());
            Ok(())
        }
    }
}
