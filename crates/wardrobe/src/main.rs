//! Wardrobe CLI - tag clothing photos with a local vision-language model.
//!
//! Wardrobe takes photos of clothing items and produces short canonical
//! tags ("blue denim jacket") using a VLM served by a local engine.
//!
//! # Usage
//!
//! ```bash
//! # Tag a photo
//! wardrobe tag shirt.jpg
//!
//! # Tag a batch, JSON output
//! wardrobe tag photos/*.jpg --json
//!
//! # Preload the model
//! wardrobe model warm
//!
//! # View configuration
//! wardrobe config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Wardrobe - tag clothing photos with a local vision-language model.
#[derive(Parser, Debug)]
#[command(name = "wardrobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag clothing in one or more photos
    Tag(cli::tag::TagArgs),

    /// Manage the vision model (status, warm, reset)
    Model(cli::model::ModelArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match wardrobe_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `wardrobe config path`."
            );
            wardrobe_core::Config::default()
        }
    };
    logging::init(&config.logging, cli.verbose, cli.json_logs);

    tracing::debug!("Wardrobe v{}", wardrobe_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Tag(args) => cli::tag::execute(args, config).await,
        Commands::Model(args) => cli::model::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
