use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use bowlwatch::{
    camera::{DirectoryFrameSource, FrameSource, FrameSourceBuilder},
    classifier::EventClassifier,
    config::BowlwatchConfig,
    frame::{FrameData, FrameFormat},
    history::{EventLog, EventRecord, JsonEventLog},
    vision::{DescriptionProvider, GeminiDescriber},
};
use clap::{Parser, Subcommand};
use tokio::fs;
use tracing::{info, warn};

/// Inspect the event history and exercise the camera and vision pipeline by hand.
#[derive(Parser, Debug)]
#[command(name = "bowltool")]
#[command(about = "Maintenance tool for the bowlwatch pet food monitor")]
struct Args {
    /// Path to bowlwatch configuration file
    #[arg(short = 'c', long, default_value = "bowlwatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the event history, newest first
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe and classify an image file without notifying or logging
    Describe {
        /// JPEG or PNG image of the bowl
        image: PathBuf,
    },

    /// Capture one frame from the configured camera and save it
    Snapshot {
        /// Output file (JPEG)
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let _ = dotenvy::dotenv();

    let config = BowlwatchConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    match args.command {
        Command::History { limit, json } => show_history(&config, limit, json).await,
        Command::Describe { image } => describe_image(&config, &image).await,
        Command::Snapshot { output } => snapshot(&config, &output).await,
    }
}

async fn show_history(config: &BowlwatchConfig, limit: usize, json: bool) -> Result<()> {
    let log = JsonEventLog::new(&config.history.path, config.history.max_entries);
    let records: Vec<EventRecord> = log.list().await?.into_iter().take(limit).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No events recorded in {}", log.path().display());
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {:<16} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            record.event.event_type(),
            record.event
        );
    }

    Ok(())
}

async fn describe_image(config: &BowlwatchConfig, image: &Path) -> Result<()> {
    let frame: FrameData = DirectoryFrameSource::load_file(image, 1)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;

    let describer = GeminiDescriber::new(&config.vision)?;
    let classifier = EventClassifier::new(&config.classifier);

    info!(
        "Describing {} ({} bytes) with {}",
        image.display(),
        frame.data.len(),
        describer.name()
    );
    let description = describer.describe(&frame).await?;

    println!("Description: {}", description.trim());
    match classifier.classify(&description) {
        Some(event) => println!("Event: {} ({})", event.event_type(), event),
        None => println!("Event: none"),
    }

    Ok(())
}

async fn snapshot(config: &BowlwatchConfig, output: &Path) -> Result<()> {
    let mut source = FrameSourceBuilder::new()
        .config(config.camera.clone())
        .build()
        .await?;

    let frame = source.read().await;
    source.release().await;

    let frame = frame?.ok_or_else(|| anyhow!("{} produced no frame", source.name()))?;

    let output = match output.extension() {
        Some(_) => output.to_path_buf(),
        None => output.with_extension(frame.format.extension()),
    };
    if FrameFormat::from_path(&output) != Some(frame.format) {
        warn!(
            "Frame is {:?} but {} suggests another format",
            frame.format,
            output.display()
        );
    }

    fs::write(&output, frame.data.as_slice())
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Saved frame {} ({}x{}, {} bytes) to {}",
        frame.id,
        frame.width,
        frame.height,
        frame.data.len(),
        output.display()
    );
    Ok(())
}
