//! The `wardrobe model` command - manage the vision model.

use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use wardrobe_core::{ClothingTagger, Config, EngineFactory};

/// Arguments for the `model` command.
#[derive(Args, Debug)]
pub struct ModelArgs {
    #[command(subcommand)]
    pub command: ModelCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    /// Show engine reachability and the configured model
    Status,

    /// Load the model into engine memory ahead of the first tag
    Warm,

    /// Drop the model and release engine memory
    Reset,
}

/// Execute the model command.
pub async fn execute(args: ModelArgs, config: Config) -> anyhow::Result<()> {
    let engine = EngineFactory::create(&config.engine)
        .map_err(|e| anyhow::anyhow!("Failed to create engine: {e}"))?;

    match args.command {
        ModelCommand::Status => {
            let available = engine.is_available().await;
            println!("Engine:    {}", config.engine.backend);
            println!("Endpoint:  {}", config.engine.endpoint);
            println!("Model:     {}", config.engine.model);
            if available {
                println!("Status:    {}", style("reachable").green());
            } else {
                println!("Status:    {}", style("unreachable").red());
            }
        }

        ModelCommand::Warm => {
            if !engine.is_available().await {
                anyhow::bail!(
                    "Engine '{}' is not reachable at {}. Is the server running?",
                    config.engine.backend,
                    config.engine.endpoint
                );
            }

            let tagger = ClothingTagger::new(engine, &config);
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_message(format!("Loading {}...", config.engine.model));
            bar.enable_steady_tick(Duration::from_millis(100));

            let start = Instant::now();
            let result = tagger.warm_up().await;
            bar.finish_and_clear();

            match result {
                Ok(()) => println!(
                    "{} Model loaded in {:.1}s",
                    style("✓").green().bold(),
                    start.elapsed().as_secs_f64()
                ),
                Err(e) => anyhow::bail!("Model warm-up failed: {e}"),
            }
        }

        ModelCommand::Reset => {
            let tagger = ClothingTagger::new(engine, &config);
            tagger.reset().await;
            println!("{} Model released", style("✓").green().bold());
        }
    }

    Ok(())
}
