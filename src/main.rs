use anyhow::Result;
use bowlwatch::{config::LoggingConfig, BowlwatchApp, BowlwatchConfig};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "bowlwatch")]
#[command(about = "Pet food bowl monitor with vision-based event detection")]
#[command(version)]
#[command(long_about = "Periodically photographs a pet food bowl, asks a vision model to describe it, \
turns the description into bowl events (empty, refilled, partially eaten) and sends a debounced \
notification for each new event. A small web page shows the event history.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "bowlwatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the monitor")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Run a single monitoring cycle and exit
    #[arg(long, help = "Capture and classify one frame, act on it if warranted, then exit")]
    once: bool,

    /// Dry run mode - build components but don't start them
    #[arg(long, help = "Perform dry run - build all components but don't start monitoring")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env file: {}", e);
        }
    }

    let config = match BowlwatchConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load configuration from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let log_guard = init_logging(&args, &config.logging)?;

    info!("Starting Bowlwatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    info!("Configuration: {:?}", config.redacted());

    let mut app = BowlwatchApp::new(config).await.map_err(|e| {
        error!("Failed to build monitor: {}", e);
        e
    })?;

    app.initialize().await.map_err(|e| {
        error!("Failed to initialize components: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - components built but not started");
        println!("✓ Dry run completed successfully - all components built");
        return Ok(());
    }

    if args.once {
        let result = app.run_once().await?;
        match (&result.error, result.event_detected) {
            (Some(e), _) => {
                println!("✗ Cycle failed: {}", e);
                drop(log_guard);
                std::process::exit(1);
            }
            (None, Some(event)) if result.acted => println!("✓ {} (notified)", event),
            (None, Some(event)) => println!("✓ {} (suppressed)", event),
            (None, None) => println!("✓ No bowl event detected"),
        }
        return Ok(());
    }

    app.start().await.map_err(|e| {
        error!("Failed to start components: {}", e);
        e
    })?;

    let exit_code = app.run().await.map_err(|e| {
        error!("Error while monitoring: {}", e);
        e
    })?;

    if exit_code != 0 {
        warn!("Bowlwatch exited with code: {}", exit_code);
    } else {
        info!("Bowlwatch exited with code: {}", exit_code);
    }

    // Flush file logs before exiting
    drop(log_guard);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{
        fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
    };

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bowlwatch={}", log_level)));

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![fmt_layer];

    // Daily rolling file log, written off the async threads
    let guard = match logging.directory.as_deref() {
        Some(directory) if !directory.is_empty() => {
            let appender = tracing_appender::rolling::daily(directory, "bowlwatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    let rendered = toml::to_string_pretty(&BowlwatchConfig::default())?;

    println!("# Bowlwatch Configuration File");
    println!("# This is the default configuration with all available options.");
    println!("# Any key can be overridden with BOWLWATCH_<SECTION>__<KEY>, e.g.");
    println!("# BOWLWATCH_MONITOR__DEBOUNCE_SECONDS=1800. The vision API key may also");
    println!("# be supplied as GEMINI_API_KEY.");
    println!();
    println!("{}", rendered);

    Ok(())
}
