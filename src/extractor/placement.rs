use crate::config::CollisionPolicy;
use crate::error::{GrayZipError, Result};
use std::fs::File;
use std::path::Path;
use tempfile::NamedTempFile;

#[cfg(unix)]
const DEFAULT_FILE_MODE: u32 = 0o644;
#[cfg(unix)]
const OWNER_READ: u32 = 0o400;

/// Writes `dest` through a temporary file in the same directory.
///
/// `fill` receives the open temporary file; the destination only appears once
/// `fill` succeeded and the file was renamed into place. On any error the
/// temporary file is removed when it drops, so a failed write never leaves a
/// file at `dest`.
pub fn write_atomically<F, T>(
    dest: &Path,
    policy: CollisionPolicy,
    mode: Option<u32>,
    fill: F,
) -> Result<T>
where
    F: FnOnce(&mut File) -> Result<T>,
{
    if policy == CollisionPolicy::Error && dest.exists() {
        return Err(GrayZipError::OutputExists {
            path: dest.to_path_buf(),
        });
    }

    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(parent).map_err(|e| GrayZipError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let value = fill(staged.as_file_mut())?;

    apply_mode(staged.as_file(), mode).map_err(|e| GrayZipError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let persisted = match policy {
        CollisionPolicy::Overwrite => staged.persist(dest),
        CollisionPolicy::Error => staged.persist_noclobber(dest),
    };

    persisted.map_err(|e| {
        if policy == CollisionPolicy::Error && e.error.kind() == std::io::ErrorKind::AlreadyExists {
            GrayZipError::OutputExists {
                path: dest.to_path_buf(),
            }
        } else {
            GrayZipError::Write {
                path: dest.to_path_buf(),
                source: e.error,
            }
        }
    })?;

    Ok(value)
}

#[cfg(unix)]
fn apply_mode(file: &File, mode: Option<u32>) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // Keep only permission bits; zip stores the file type in the upper bits.
    // The owner must be able to read the file back for conversion.
    let mode = mode.map(|m| (m & 0o777) | OWNER_READ).unwrap_or(DEFAULT_FILE_MODE);
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_file: &File, _mode: Option<u32>) -> std::io::Result<()> {
    Ok(())
}
