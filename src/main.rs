//! RetinaDx - combined OCT + Fundus retinal diagnosis
//!
//! A CLI tool that classifies an OCT scan and a Fundus photograph with two
//! independently trained models and reconciles both predictions into a
//! single diagnosis.
//!
//! Exit codes:
//!   0 - Diagnosis produced
//!   1 - Runtime error (bad arguments, config, unreachable output path, etc.)
//!   2 - No diagnosis possible (rejected input, or neither model produced a prediction)

mod analysis;
mod classifier;
mod cli;
mod config;
mod error;
mod explanations;
mod input;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use classifier::ImageTensor;
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::{ImagePaths, Modality};
use pipeline::{DiagnosisPipeline, ImagePair};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("RetinaDx v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Diagnosis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .retinadx.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    println!("   Edit it to point at your model servers and class orders.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout carries only the report.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one diagnosis. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let format = config.general.format;

    // Step 1: Input boundary
    let (images, paths) = match input::load_image_pair(
        args.oct.as_deref(),
        args.fundus.as_deref(),
        &config.image.allowed_extensions,
    ) {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!("Rejected {} input: {}", e.modality(), e);
            emit(&render_error(format, &e.to_string())?, &config)?;
            return Ok(2);
        }
    };

    if args.dry_run {
        return handle_dry_run(&images, &paths, config.image.target_size);
    }

    // Step 2: Load both classifiers once
    let pipeline = DiagnosisPipeline::from_config(&config)?;

    // Step 3: Classify and aggregate
    let spinner = (!args.quiet).then(start_spinner);
    let result = pipeline.diagnose(&images).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            emit(&render_error(format, &e.to_string())?, &config)?;
            return Ok(2);
        }
    };

    // Step 4: Render
    let report = report::build_report(&outcome, paths);
    let rendered = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };
    emit(&rendered, &config)?;

    info!(
        "{} ({}) in {:.1}s",
        report.prediction,
        report.confidence,
        start_time.elapsed().as_secs_f64()
    );

    Ok(0)
}

fn render_error(format: OutputFormat, message: &str) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => report::generate_json_error(message)?,
        OutputFormat::Markdown => report::generate_markdown_error(message),
    })
}

/// Write to the configured output file, or stdout.
fn emit(content: &str, config: &Config) -> Result<()> {
    match config.general.output {
        Some(ref output) => {
            std::fs::write(output, content)
                .with_context(|| format!("Failed to write report to {}", output))?;
            eprintln!("📝 Report saved to: {}", output);
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn start_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message("Running OCT and Fundus classifiers...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Handle --dry-run: decode both images, print what would be sent, exit.
fn handle_dry_run(images: &ImagePair, paths: &ImagePaths, target_size: u32) -> Result<i32> {
    println!("🔍 Dry run: decoding images (no model calls)...\n");

    let mut all_ok = true;
    for modality in Modality::ALL {
        let (bytes, path) = match modality {
            Modality::Oct => (&images.oct, &paths.oct),
            Modality::Fundus => (&images.fundus, &paths.fundus),
        };

        match ImageTensor::from_image_bytes(bytes, target_size) {
            Ok(tensor) => {
                let data = tensor.as_slice();
                let mean = data.iter().sum::<f32>() / data.len().max(1) as f32;
                println!(
                    "   ✅ {}: {} -> tensor {:?}, mean intensity {:.3}",
                    modality,
                    path,
                    tensor.shape(),
                    mean
                );
            }
            Err(e) => {
                all_ok = false;
                println!("   ❌ {}: {} -> {}", modality, path, e);
            }
        }
    }

    println!("\n✅ Dry run complete. No model calls were made.");
    Ok(if all_ok { 0 } else { 2 })
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
