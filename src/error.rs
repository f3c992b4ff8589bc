use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrayZipError {
    #[error("Failed to open archive {path}: {source}")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to read archive entry {entry}: {source}")]
    ArchiveEntry {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive entry escapes the extraction directory: {entry}")]
    UnsafeEntryPath { entry: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output file already exists: {path}")]
    OutputExists { path: PathBuf },

    #[error("Failed to process image {path}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{failed} of {total} image conversions failed; first error: {first}")]
    ConversionFailed {
        failed: usize,
        total: usize,
        first: Box<GrayZipError>,
    },

    #[error("Background task failed: {message}")]
    Task { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Scan,
    Convert,
    Setup,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Extract => "extraction",
            Stage::Scan => "scan",
            Stage::Convert => "conversion",
            Stage::Setup => "setup",
        };
        f.write_str(name)
    }
}

impl GrayZipError {
    /// Archive missing, unreadable or not a valid container.
    pub fn is_archive_error(&self) -> bool {
        matches!(
            self,
            GrayZipError::ArchiveOpen { .. }
                | GrayZipError::ArchiveEntry { .. }
                | GrayZipError::UnsafeEntryPath { .. }
        )
    }

    pub fn is_codec_error(&self) -> bool {
        match self {
            GrayZipError::Codec { .. } => true,
            GrayZipError::ConversionFailed { first, .. } => first.is_codec_error(),
            _ => false,
        }
    }

    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            GrayZipError::Write { .. }
                | GrayZipError::Scan { .. }
                | GrayZipError::Io(_)
                | GrayZipError::OutputExists { .. }
        )
    }

    /// Stage the error belongs to, when the variant alone determines it.
    /// Write, collision and join failures occur in several stages.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GrayZipError::ArchiveOpen { .. }
            | GrayZipError::ArchiveEntry { .. }
            | GrayZipError::UnsafeEntryPath { .. } => Some(Stage::Extract),
            GrayZipError::Scan { .. } => Some(Stage::Scan),
            GrayZipError::Codec { .. } | GrayZipError::ConversionFailed { .. } => {
                Some(Stage::Convert)
            }
            GrayZipError::Config { .. } => Some(Stage::Setup),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            GrayZipError::Config { .. } => 2,
            GrayZipError::ArchiveOpen { .. }
            | GrayZipError::ArchiveEntry { .. }
            | GrayZipError::UnsafeEntryPath { .. } => 3,
            GrayZipError::Codec { .. } | GrayZipError::ConversionFailed { .. } => 4,
            GrayZipError::OutputExists { .. } => 5,
            GrayZipError::Write { .. } | GrayZipError::Scan { .. } | GrayZipError::Io(_) => 6,
            GrayZipError::Task { .. } => 1,
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for GrayZipError {
    fn user_message(&self) -> String {
        match self {
            GrayZipError::ArchiveOpen { path, source } => {
                format!("Could not open archive {}: {}", path.display(), source)
            }
            GrayZipError::ArchiveEntry { entry, source } => {
                format!("Archive entry '{}' is unreadable: {}", entry, source)
            }
            GrayZipError::UnsafeEntryPath { entry } => {
                format!("Refusing to extract '{}' outside the extraction directory", entry)
            }
            GrayZipError::Write { path, source } => {
                format!("Could not write {}: {}", path.display(), source)
            }
            GrayZipError::Scan { path, source } => {
                format!("Could not list {}: {}", path.display(), source)
            }
            GrayZipError::OutputExists { path } => {
                format!("Refusing to overwrite existing file: {}", path.display())
            }
            GrayZipError::Codec { path, source } => {
                format!("Image {} could not be processed: {}", path.display(), source)
            }
            GrayZipError::ConversionFailed { failed, total, first } => {
                format!(
                    "{} of {} images failed to convert. First failure: {}",
                    failed,
                    total,
                    first.user_message()
                )
            }
            GrayZipError::Config { message } => format!("Configuration error: {}", message),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            GrayZipError::ArchiveOpen { .. } => Some(
                "Check that the archive path is correct and that the file is a valid ZIP archive.".to_string()
            ),
            GrayZipError::UnsafeEntryPath { .. } => Some(
                "The archive contains absolute or '..' paths. Repack it with relative entry names.".to_string()
            ),
            GrayZipError::Write { .. } | GrayZipError::Io(_) => Some(
                "Ensure you have write permission for the target directory and enough free disk space.".to_string()
            ),
            GrayZipError::OutputExists { .. } => Some(
                "Remove the existing file, choose another directory, or use --on-collision overwrite.".to_string()
            ),
            GrayZipError::Codec { .. } | GrayZipError::ConversionFailed { .. } => Some(
                "Make sure every file with the target extension is a valid image of that format.".to_string()
            ),
            GrayZipError::Config { .. } => Some(
                "Check your configuration file syntax and the values passed on the command line.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for GrayZipError {
    fn from(error: toml::de::Error) -> Self {
        GrayZipError::Config {
            message: error.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for GrayZipError {
    fn from(error: tokio::task::JoinError) -> Self {
        GrayZipError::Task {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GrayZipError>;
