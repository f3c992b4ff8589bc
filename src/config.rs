use crate::error::{GrayZipError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub scan: ScanConfig,
    pub convert: ConvertConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    pub path: PathBuf,
    pub extract_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Case-sensitive, without the leading dot.
    pub extension: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvertConfig {
    pub output_dir: PathBuf,
    pub mode: ConversionMode,
    pub jobs: usize,
    pub on_collision: CollisionPolicy,
}

/// How discovered images are scheduled for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionMode {
    /// One image at a time, in listing order.
    Sequential,
    /// One task per image, all awaited together.
    FanOut,
}

/// What to do when a file about to be written already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    #[default]
    Overwrite,
    Error,
}

impl std::fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionMode::Sequential => f.write_str("sequential"),
            ConversionMode::FanOut => f.write_str("fan-out"),
        }
    }
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionPolicy::Overwrite => f.write_str("overwrite"),
            CollisionPolicy::Error => f.write_str("error"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive: ArchiveConfig::default(),
            scan: ScanConfig::default(),
            convert: ConvertConfig::default(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("myfile.zip"),
            extract_dir: PathBuf::from("unzipped"),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: "png".to_string(),
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("grayscaled"),
            mode: ConversionMode::Sequential,
            jobs: num_cpus::get().max(1),
            on_collision: CollisionPolicy::Overwrite,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GrayZipError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| GrayZipError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| GrayZipError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["grayzip.toml", ".grayzip.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref archive) = cli_args.archive {
            self.archive.path = archive.clone();
        }

        if let Some(ref extract_dir) = cli_args.extract_dir {
            self.archive.extract_dir = extract_dir.clone();
        }

        if let Some(ref extension) = cli_args.extension {
            self.scan.extension = extension.trim().to_string();
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.convert.output_dir = output_dir.clone();
        }

        if let Some(mode) = cli_args.mode {
            self.convert.mode = mode;
        }

        if let Some(jobs) = cli_args.jobs {
            self.convert.jobs = jobs;
        }

        if let Some(policy) = cli_args.on_collision {
            self.convert.on_collision = policy;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| GrayZipError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| GrayZipError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.extension.is_empty() {
            return Err(GrayZipError::Config {
                message: "An image extension must be specified".to_string(),
            });
        }

        if self.scan.extension.starts_with('.') {
            return Err(GrayZipError::Config {
                message: format!(
                    "Extension must not include the leading dot: {}",
                    self.scan.extension
                ),
            });
        }

        if self.convert.jobs == 0 {
            return Err(GrayZipError::Config {
                message: "Number of conversion jobs must be greater than 0".to_string(),
            });
        }

        if lexical_path(&self.archive.extract_dir) == lexical_path(&self.convert.output_dir) {
            return Err(GrayZipError::Config {
                message: format!(
                    "Extraction and output directories must differ: {}",
                    self.convert.output_dir.display()
                ),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

/// `path` without `.` components, so `unzipped` and `./unzipped/` compare equal.
fn lexical_path(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub archive: Option<PathBuf>,
    pub extract_dir: Option<PathBuf>,
    pub extension: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub mode: Option<ConversionMode>,
    pub jobs: Option<usize>,
    pub on_collision: Option<CollisionPolicy>,
}

impl CliOverrides {
    pub fn with_archive(mut self, archive: Option<PathBuf>) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_extract_dir(mut self, extract_dir: Option<PathBuf>) -> Self {
        self.extract_dir = extract_dir;
        self
    }

    pub fn with_extension(mut self, extension: Option<String>) -> Self {
        self.extension = extension;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_mode(mut self, mode: Option<ConversionMode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_on_collision(mut self, policy: Option<CollisionPolicy>) -> Self {
        self.on_collision = policy;
        self
    }
}
