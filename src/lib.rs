pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod extractor;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, CollisionPolicy, Config, ConversionMode};
pub use error::{GrayZipError, Result, Stage, UserFriendlyError};

// Core functionality re-exports
pub use converter::{desaturate, ConversionOutcome, GrayscaleConverter};
pub use extractor::{ArchiveExtractor, ExtractionSummary};
pub use scanner::{FileFilter, ImageScanner};
pub use ui::{OutputFormatter, OutputMode};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

/// Filesystem locations the pipeline reads from and writes to.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub archive: PathBuf,
    pub unzip_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl PipelinePaths {
    pub fn new<A, U, O>(archive: A, unzip_dir: U, output_dir: O) -> Self
    where
        A: Into<PathBuf>,
        U: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        Self {
            archive: archive.into(),
            unzip_dir: unzip_dir.into(),
            output_dir: output_dir.into(),
        }
    }
}

impl From<&Config> for PipelinePaths {
    fn from(config: &Config) -> Self {
        Self::new(
            config.archive.path.clone(),
            config.archive.extract_dir.clone(),
            config.convert.output_dir.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub extension: String,
    pub mode: ConversionMode,
    pub jobs: usize,
    pub on_collision: CollisionPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            extension: config.scan.extension.clone(),
            mode: config.convert.mode,
            jobs: config.convert.jobs,
            on_collision: config.convert.on_collision,
        }
    }
}

impl PipelineOptions {
    pub fn with_mode(mut self, mode: ConversionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Stage boundaries reported to an observer while the pipeline runs.
#[derive(Debug)]
pub enum StageEvent<'a> {
    Extracted(&'a ExtractionSummary),
    Scanned(&'a [PathBuf]),
    Converted(&'a [ConversionOutcome]),
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub archive: PathBuf,
    pub unzip_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mode: ConversionMode,
    pub extraction: ExtractionSummary,
    pub images: Vec<PathBuf>,
    pub converted: Vec<ConversionOutcome>,
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

/// Runs extract, scan and convert in order, stopping at the first failure.
pub async fn run_pipeline(
    paths: &PipelinePaths,
    options: &PipelineOptions,
) -> Result<PipelineReport> {
    run_pipeline_with(paths, options, None).await
}

/// Same as [`run_pipeline`], calling `observer` after each completed stage.
pub async fn run_pipeline_with(
    paths: &PipelinePaths,
    options: &PipelineOptions,
    observer: Option<&(dyn Fn(StageEvent<'_>) + Send + Sync)>,
) -> Result<PipelineReport> {
    let start_time = Instant::now();
    let notify = |event: StageEvent<'_>| {
        if let Some(observer) = observer {
            observer(event);
        }
    };

    let extraction = extract_archive(paths, options.on_collision)
        .await
        .inspect_err(|e| log::error!("{} stage failed: {}", Stage::Extract, e))?;
    notify(StageEvent::Extracted(&extraction));

    let images = ImageScanner::with_filter(FileFilter::with_extension(options.extension.clone()))
        .list_images(&paths.unzip_dir)
        .inspect_err(|e| log::error!("{} stage failed: {}", Stage::Scan, e))?;
    notify(StageEvent::Scanned(&images));

    let converted = convert_images(&images, &paths.output_dir, options)
        .await
        .inspect_err(|e| log::error!("{} stage failed: {}", Stage::Convert, e))?;
    notify(StageEvent::Converted(&converted));

    Ok(PipelineReport {
        archive: paths.archive.clone(),
        unzip_dir: paths.unzip_dir.clone(),
        output_dir: paths.output_dir.clone(),
        mode: options.mode,
        extraction,
        images,
        converted,
        duration: start_time.elapsed(),
        finished_at: Utc::now(),
    })
}

async fn extract_archive(
    paths: &PipelinePaths,
    policy: CollisionPolicy,
) -> Result<ExtractionSummary> {
    let archive = paths.archive.clone();
    let unzip_dir = paths.unzip_dir.clone();

    // Completes, archive handle closed, before anything else starts.
    task::spawn_blocking(move || {
        ArchiveExtractor::new()
            .with_collision_policy(policy)
            .extract(&archive, &unzip_dir)
    })
    .await?
}

async fn convert_images(
    images: &[PathBuf],
    output_dir: &Path,
    options: &PipelineOptions,
) -> Result<Vec<ConversionOutcome>> {
    std::fs::create_dir_all(output_dir).map_err(|e| GrayZipError::Write {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let jobs = images
        .iter()
        .map(|input| -> Result<(PathBuf, PathBuf)> {
            Ok((input.clone(), output_path_for(input, output_dir)?))
        })
        .collect::<Result<Vec<_>>>()?;

    if jobs.is_empty() {
        log::info!("no images to convert");
        return Ok(Vec::new());
    }

    match options.mode {
        ConversionMode::Sequential => convert_sequential(jobs, options.on_collision).await,
        ConversionMode::FanOut => {
            convert_fan_out(jobs, options.on_collision, options.jobs.max(1)).await
        }
    }
}

fn output_path_for(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    input
        .file_name()
        .map(|name| output_dir.join(name))
        .ok_or_else(|| GrayZipError::Write {
            path: input.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "image path has no file name",
            ),
        })
}

async fn convert_one(
    input: PathBuf,
    output: PathBuf,
    policy: CollisionPolicy,
) -> Result<ConversionOutcome> {
    task::spawn_blocking(move || {
        GrayscaleConverter::new()
            .with_collision_policy(policy)
            .convert(&input, &output)
    })
    .await?
}

async fn convert_sequential(
    jobs: Vec<(PathBuf, PathBuf)>,
    policy: CollisionPolicy,
) -> Result<Vec<ConversionOutcome>> {
    let mut converted = Vec::with_capacity(jobs.len());

    for (input, output) in jobs {
        converted.push(convert_one(input, output, policy).await?);
    }

    Ok(converted)
}

/// Converts every image concurrently and waits for all of them.
///
/// Siblings of a failed conversion still run to completion. The returned error
/// counts the failures and carries the first one in listing order.
async fn convert_fan_out(
    jobs: Vec<(PathBuf, PathBuf)>,
    policy: CollisionPolicy,
    max_concurrent: usize,
) -> Result<Vec<ConversionOutcome>> {
    let total = jobs.len();
    let permits = Arc::new(Semaphore::new(max_concurrent));
    let mut set = JoinSet::new();

    for (index, (input, output)) in jobs.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => convert_one(input.clone(), output, policy).await,
                Err(e) => Err(GrayZipError::Task {
                    message: e.to_string(),
                }),
            };
            (index, input, result)
        });
    }

    let mut converted = Vec::with_capacity(total);
    let mut failures = Vec::new();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, _, Ok(outcome))) => converted.push((index, outcome)),
            Ok((index, input, Err(e))) => {
                log::warn!("conversion of {} failed: {}", input.display(), e);
                failures.push((index, e));
            }
            Err(e) => {
                log::warn!("conversion task failed: {}", e);
                failures.push((usize::MAX, GrayZipError::from(e)));
            }
        }
    }

    if !failures.is_empty() {
        let failed = failures.len();
        failures.sort_by_key(|(index, _)| *index);
        let (_, first) = failures.swap_remove(0);
        return Err(GrayZipError::ConversionFailed {
            failed,
            total,
            first: Box::new(first),
        });
    }

    converted.sort_by_key(|(index, _)| *index);
    Ok(converted.into_iter().map(|(_, outcome)| outcome).collect())
}

/// Main library interface for GrayZip functionality
pub struct GrayZip {
    config: Config,
    output_formatter: OutputFormatter,
}

impl GrayZip {
    /// Create a new GrayZip instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
        })
    }

    /// Create GrayZip instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    pub fn paths(&self) -> PipelinePaths {
        PipelinePaths::from(&self.config)
    }

    pub fn options(&self) -> PipelineOptions {
        PipelineOptions::from(&self.config)
    }

    /// Run extract, scan and convert with the configured paths
    pub async fn run(&self) -> Result<PipelineReport> {
        let paths = self.paths();
        let options = self.options();
        let formatter = &self.output_formatter;

        formatter.start_operation(&format!(
            "Extracting {} into {}",
            paths.archive.display(),
            paths.unzip_dir.display()
        ));

        let observer = |event: StageEvent<'_>| match event {
            StageEvent::Extracted(summary) => {
                formatter.info(&format!(
                    "File extraction done: {} files, {} directories",
                    summary.file_count(),
                    summary.directories
                ));
            }
            StageEvent::Scanned(images) => {
                formatter.info(&format!(
                    "Found {} .{} images in {}",
                    images.len(),
                    options.extension,
                    paths.unzip_dir.display()
                ));
                formatter.start_operation(&format!(
                    "Converting {} images ({})",
                    images.len(),
                    options.mode
                ));
            }
            StageEvent::Converted(outcomes) => {
                formatter.info(&format!(
                    "Wrote {} images to {}",
                    outcomes.len(),
                    paths.output_dir.display()
                ));
            }
        };

        let report = run_pipeline_with(&paths, &options, Some(&observer)).await?;

        formatter.success("Grayscale transformation complete for all images.");
        Ok(report)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(|e| GrayZipError::Write {
            path: output_path.as_ref().to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &GrayZipError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}
