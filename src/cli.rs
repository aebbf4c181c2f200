//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// RetinaDx - combined OCT + Fundus retinal diagnosis
///
/// Classifies one OCT scan and one Fundus photograph with two independent
/// models and reconciles them into a single diagnosis with a confidence
/// score and an explanation.
///
/// Examples:
///   retinadx --oct scan.png --fundus photo.jpg
///   retinadx --oct scan.png --fundus photo.jpg --format json --output result.json
///   retinadx --oct scan.png --fundus photo.jpg --oct-url http://gpu:8501
///   retinadx --oct scan.png --fundus photo.jpg --dry-run
///   retinadx --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// OCT scan image (png, jpg, jpeg)
    #[arg(long, value_name = "FILE")]
    pub oct: Option<PathBuf>,

    /// Fundus photograph (png, jpg, jpeg)
    #[arg(long, value_name = "FILE")]
    pub fundus: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .retinadx.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model server URL for the OCT classifier
    #[arg(long, value_name = "URL", env = "RETINADX_OCT_URL")]
    pub oct_url: Option<String>,

    /// Model server URL for the Fundus classifier
    #[arg(long, value_name = "URL", env = "RETINADX_FUNDUS_URL")]
    pub fundus_url: Option<String>,

    /// Per-request inference timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Square input resolution expected by both models
    #[arg(long, value_name = "PIXELS")]
    pub image_size: Option<u32>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: validate and decode both images without calling the models
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .retinadx.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// Image paths are checked later at the input boundary so their
    /// errors can be rendered in the requested report format.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        for url in [&self.oct_url, &self.fundus_url].into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Model server URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(size) = self.image_size {
            if size == 0 {
                return Err("Image size must be at least 1 pixel".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            oct: Some(PathBuf::from("oct.png")),
            fundus: Some(PathBuf::from("fundus.jpg")),
            config: None,
            oct_url: None,
            fundus_url: None,
            timeout: None,
            image_size: None,
            format: None,
            output: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "retinadx",
            "--oct",
            "a.png",
            "--fundus",
            "b.jpeg",
            "--format",
            "json",
            "--timeout",
            "30",
        ])
        .unwrap();

        assert_eq!(args.oct, Some(PathBuf::from("a.png")));
        assert_eq!(args.fundus, Some(PathBuf::from("b.jpeg")));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.timeout, Some(30));
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.oct_url = Some("localhost:8501".to_string());
        assert!(args.validate().is_err());

        args.oct_url = Some("http://localhost:8501".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
