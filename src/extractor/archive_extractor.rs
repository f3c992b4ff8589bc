use crate::config::CollisionPolicy;
use crate::error::{GrayZipError, Result};
use crate::extractor::placement::write_atomically;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use zip::ZipArchive;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// Relative paths of the file entries written, in archive order.
    pub files: Vec<PathBuf>,
    pub directories: usize,
    pub bytes_written: u64,
    pub extraction_duration: Duration,
}

impl ExtractionSummary {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

pub struct ArchiveExtractor {
    collision: CollisionPolicy,
    buffer_size: usize,
}

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self {
            collision: CollisionPolicy::Overwrite,
            buffer_size: 64 * 1024, // 64KB buffer
        }
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096); // Minimum 4KB buffer
        self
    }

    /// Extracts every entry of the ZIP archive at `archive_path` into `output_dir`.
    ///
    /// Entries are processed in the order the archive stores them. Extraction stops
    /// at the first failing entry; entries written before it stay on disk.
    pub fn extract(&self, archive_path: &Path, output_dir: &Path) -> Result<ExtractionSummary> {
        let start_time = Instant::now();

        fs::create_dir_all(output_dir).map_err(|e| GrayZipError::Write {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let file = File::open(archive_path).map_err(|e| GrayZipError::ArchiveOpen {
            path: archive_path.to_path_buf(),
            source: zip::result::ZipError::Io(e),
        })?;

        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| GrayZipError::ArchiveOpen {
                path: archive_path.to_path_buf(),
                source: e,
            })?;

        log::info!(
            "extracting {} entries from {} into {}",
            archive.len(),
            archive_path.display(),
            output_dir.display()
        );

        let mut summary = ExtractionSummary::default();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| GrayZipError::ArchiveEntry {
                entry: format!("#{}", index),
                source: std::io::Error::other(e),
            })?;

            let name = entry.name().to_string();
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| GrayZipError::UnsafeEntryPath {
                    entry: name.clone(),
                })?;
            let dest = output_dir.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest).map_err(|e| GrayZipError::Write {
                    path: dest.clone(),
                    source: e,
                })?;
                log::debug!("created directory {}", dest.display());
                summary.directories += 1;
                continue;
            }

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| GrayZipError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }

            let mode = entry.unix_mode();
            let bytes = write_atomically(&dest, self.collision, mode, |file| {
                self.copy_entry(&mut entry, file, &name, &dest)
            })?;

            log::debug!("extracted {} ({} bytes)", dest.display(), bytes);
            summary.bytes_written += bytes;
            summary.files.push(relative);
        }

        summary.extraction_duration = start_time.elapsed();
        log::info!(
            "extraction done: {} files, {} directories",
            summary.file_count(),
            summary.directories
        );

        Ok(summary)
    }

    fn copy_entry<R: Read>(
        &self,
        entry: &mut R,
        file: &mut File,
        name: &str,
        dest: &Path,
    ) -> Result<u64> {
        let mut writer = BufWriter::with_capacity(self.buffer_size, file);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut total_bytes = 0u64;

        loop {
            // Decompression and CRC failures surface here.
            let bytes_read = entry
                .read(&mut buffer)
                .map_err(|e| GrayZipError::ArchiveEntry {
                    entry: name.to_string(),
                    source: e,
                })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| GrayZipError::Write {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            total_bytes += bytes_read as u64;
        }

        writer.flush().map_err(|e| GrayZipError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(total_bytes)
    }
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new()
    }
}
