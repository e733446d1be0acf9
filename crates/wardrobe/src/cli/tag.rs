//! The `wardrobe tag` command - tag clothing in one or more photos.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use wardrobe_core::{
    media, Alert, AlertKind, ClothingTagger, Config, EngineFactory, TagOutcome, TaggingError,
};

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Image files to tag (processed one at a time)
    #[arg(required = true)]
    pub images: Vec<String>,

    /// Print one JSON object per image instead of styled text
    #[arg(long)]
    pub json: bool,

    /// Preload the model before the first image
    #[arg(long)]
    pub warm: bool,
}

/// Execute the tag command.
pub async fn execute(args: TagArgs, config: Config) -> anyhow::Result<()> {
    let engine = EngineFactory::create(&config.engine)
        .map_err(|e| anyhow::anyhow!("Failed to create engine: {e}"))?;

    if !engine.is_available().await {
        anyhow::bail!(
            "Engine '{}' is not reachable at {}. Is the server running?",
            config.engine.backend,
            config.engine.endpoint
        );
    }

    let tagger = ClothingTagger::new(engine, &config);

    // Ctrl-C cancels the in-flight analysis; cancellation is silent, not an
    // error.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    if args.warm {
        let spinner = spinner("Loading model...");
        let result = tagger.warm_up().await;
        spinner.finish_and_clear();
        if let Err(e) = result {
            anyhow::bail!("Model warm-up failed: {e}");
        }
    }

    let mut closet: Vec<(String, String)> = Vec::new();
    let mut no_clothing = 0usize;
    let mut failed = 0usize;

    for image_arg in &args.images {
        if cancel.is_cancelled() {
            break;
        }

        let path = PathBuf::from(shellexpand::tilde(image_arg).into_owned());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_arg.clone());

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to read {}: {e}", path.display());
                report_alert(
                    &file_name,
                    &Alert {
                        kind: AlertKind::Error,
                        message: "Failed to load image.".to_string(),
                    },
                    args.json,
                );
                failed += 1;
                continue;
            }
        };

        let image = match media::prepare_image(bytes, &config.image).await {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Failed to prepare {}: {e}", path.display());
                report_alert(
                    &file_name,
                    &Alert {
                        kind: AlertKind::Error,
                        message: "Failed to load image.".to_string(),
                    },
                    args.json,
                );
                failed += 1;
                continue;
            }
        };

        let busy = spinner(&format!("Analyzing {file_name}..."));
        let result = tagger.tag(&image, &cancel).await;
        busy.finish_and_clear();

        match result {
            Ok(outcome) => {
                if args.json {
                    let mut record = serde_json::to_value(&outcome)?;
                    record["file"] = serde_json::Value::String(file_name.clone());
                    println!("{record}");
                } else if let Some(alert) = outcome.alert() {
                    print_alert(&file_name, &alert);
                }
                match outcome {
                    TagOutcome::Tag { tag } => {
                        if !args.json {
                            println!(
                                "{} {} {} {}",
                                style("✓").green().bold(),
                                file_name,
                                style("→").dim(),
                                style(&tag).cyan()
                            );
                        }
                        closet.push((file_name, tag));
                    }
                    TagOutcome::NoClothing => no_clothing += 1,
                }
            }
            Err(TaggingError::Cancelled) => break,
            Err(err) => {
                if let Some(alert) = Alert::from_error(&err) {
                    report_alert(&file_name, &alert, args.json);
                }
                failed += 1;
            }
        }
    }

    if !args.json {
        print_summary(&closet, no_clothing, failed, cancel.is_cancelled());
    }

    if failed > 0 {
        anyhow::bail!("{failed} image(s) failed");
    }
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn report_alert(file_name: &str, alert: &Alert, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "file": file_name,
                "alert": alert,
            })
        );
    } else {
        print_alert(file_name, alert);
    }
}

fn print_alert(file_name: &str, alert: &Alert) {
    match alert.kind {
        AlertKind::Error => println!(
            "{} {} {} {}",
            style("✗").red().bold(),
            file_name,
            style("→").dim(),
            style(&alert.message).red()
        ),
        AlertKind::Warning => println!(
            "{} {} {} {}",
            style("!").yellow().bold(),
            file_name,
            style("→").dim(),
            style(&alert.message).yellow()
        ),
    }
}

fn print_summary(closet: &[(String, String)], no_clothing: usize, failed: usize, cancelled: bool) {
    println!();
    if cancelled {
        println!("{}", style("Cancelled.").dim());
    }
    if closet.is_empty() {
        println!("{}", style("No clothes added to the closet.").dim());
    } else {
        println!("{}", style("Closet").bold());
        for (file, tag) in closet {
            println!("  {:<30} {}", style(file).dim(), tag);
        }
    }
    println!(
        "{}",
        style(format!(
            "{} tagged, {} without clothing, {} failed",
            closet.len(),
            no_clothing,
            failed
        ))
        .dim()
    );
}
