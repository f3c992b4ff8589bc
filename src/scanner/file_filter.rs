use crate::config::ScanConfig;
use std::path::Path;

/// Matches file names against the target image extension.
///
/// Matching is exact and case-sensitive: with extension `png`, `a.png`
/// matches while `a.PNG` and `a.png.bak` do not.
pub struct FileFilter {
    image_extension: String,
}

impl FileFilter {
    pub fn new(config: &ScanConfig) -> Self {
        Self::with_extension(config.extension.clone())
    }

    pub fn with_extension<S: Into<String>>(extension: S) -> Self {
        Self {
            image_extension: extension.into(),
        }
    }

    pub fn is_image_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext == self.image_extension)
    }

    pub fn get_extension(&self) -> &str {
        &self.image_extension
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_file_detection() {
        let filter = FileFilter::default();

        assert!(filter.is_image_file(Path::new("a.png")));
        assert!(filter.is_image_file(Path::new("unzipped/dir/b.png")));

        assert!(!filter.is_image_file(Path::new("notes.txt")));
        assert!(!filter.is_image_file(Path::new("png")));
        assert!(!filter.is_image_file(Path::new(".png")));
        assert!(!filter.is_image_file(Path::new("a.png.bak")));
        assert!(!filter.is_image_file(Path::new("archive.zip")));
    }

    #[test]
    fn test_case_sensitive_extensions() {
        let filter = FileFilter::default();

        assert!(filter.is_image_file(Path::new("photo.png")));
        assert!(!filter.is_image_file(Path::new("photo.PNG")));
        assert!(!filter.is_image_file(Path::new("photo.Png")));
    }

    #[test]
    fn test_custom_extension() {
        let filter = FileFilter::with_extension("jpg");
        assert_eq!(filter.get_extension(), "jpg");
        assert!(filter.is_image_file(Path::new("x.jpg")));
        assert!(!filter.is_image_file(Path::new("x.png")));
    }
}
