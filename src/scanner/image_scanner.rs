use crate::config::ScanConfig;
use crate::error::{GrayZipError, Result};
use crate::scanner::file_filter::FileFilter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct ImageScanner {
    filter: FileFilter,
}

impl ImageScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            filter: FileFilter::new(config),
        }
    }

    pub fn with_filter(filter: FileFilter) -> Self {
        Self { filter }
    }

    /// Lists the images directly inside `dir`, without descending into
    /// subdirectories.
    ///
    /// Paths come back in directory listing order, which is stable for a
    /// given filesystem state but not sorted.
    pub fn list_images<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false);

        let mut images = Vec::new();

        for entry in walker {
            let entry = entry.map_err(|e| GrayZipError::Scan {
                path: dir.to_path_buf(),
                source: e,
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            if self.filter.is_image_file(entry.path()) {
                images.push(dir.join(entry.file_name()));
            }
        }

        log::info!(
            "found {} .{} files in {}",
            images.len(),
            self.filter.get_extension(),
            dir.display()
        );

        Ok(images)
    }
}
