//! The `wardrobe config` command for configuration management.

use clap::{Args, Subcommand};
use console::style;
use wardrobe_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration as TOML
    Show {
        /// Print built-in defaults instead of the loaded configuration
        #[arg(long)]
        defaults: bool,
    },

    /// Show the config file path and whether it exists
    Path,

    /// Write a config file with defaults
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    let path = Config::default_path();

    match args.command {
        ConfigCommand::Show { defaults } => {
            let config = if defaults {
                Config::default()
            } else {
                Config::load()?
            };
            print!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            if path.exists() {
                println!("{}", path.display());
            } else {
                println!("{} {}", path.display(), style("(not created yet)").dim());
            }
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Config::default().to_toml()?)?;
            println!(
                "{} Configuration written to {}",
                style("✓").green().bold(),
                path.display()
            );
        }
    }

    Ok(())
}
