use crate::config::{CliOverrides, CollisionPolicy, Config, ConversionMode};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "grayzip")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract a ZIP archive of images and write grayscale copies")]
#[command(
    long_about = "GrayZip extracts a ZIP archive into a directory, picks the images at the top \
                  of that directory and writes a grayscale copy of each one into an output directory."
)]
#[command(after_help = "EXAMPLES:\n  \
    grayzip\n  \
    grayzip photos.zip --extract-dir photos --output photos-gray\n  \
    grayzip photos.zip --mode fan-out --jobs 4\n  \
    grayzip scans.zip --extension jpg --on-collision error\n  \
    grayzip --config my-config.toml")]
pub struct Cli {
    /// ZIP archive to extract (defaults to myfile.zip)
    pub archive: Option<PathBuf>,

    /// Directory the archive is extracted into (defaults to unzipped)
    #[arg(short = 'x', long)]
    pub extract_dir: Option<PathBuf>,

    /// Directory grayscale images are written to (defaults to grayscaled)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Image extension to pick up, case-sensitive, without the dot
    #[arg(short, long, help = "Image extension to convert (e.g. png)")]
    pub extension: Option<String>,

    /// How images are scheduled for conversion
    #[arg(short, long, value_enum)]
    pub mode: Option<ConversionMode>,

    /// Maximum concurrent conversions in fan-out mode
    #[arg(short, long, help = "Concurrent conversions in fan-out mode (defaults to CPU count)")]
    pub jobs: Option<usize>,

    /// What to do when a file to be written already exists
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionPolicy>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show the resolved plan without touching the filesystem)
    #[arg(long, help = "Show what would be done without doing it")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::default()
            .with_archive(self.archive.clone())
            .with_extract_dir(self.extract_dir.clone())
            .with_output_dir(self.output.clone())
            .with_extension(self.extension.clone())
            .with_mode(self.mode)
            .with_jobs(self.jobs)
            .with_on_collision(self.on_collision)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
