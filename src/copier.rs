use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::BuildError;

/// Create a directory and its parents, mapping ENOSPC to `DiskFull`
fn create_dir(path: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(path).map_err(|e| {
        // ENOSPC on Unix
        if e.raw_os_error() == Some(28) {
            return BuildError::DiskFull {
                path: path.to_path_buf(),
            };
        }
        BuildError::CreateDirFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Copy a single file from src to dst
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, BuildError> {
    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            create_dir(parent)?;
        }
    }

    fs::copy(src, dst).map_err(|e| {
        if e.raw_os_error() == Some(28) {
            return BuildError::DiskFull {
                path: dst.to_path_buf(),
            };
        }
        BuildError::CopyFailed {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source: e,
        }
    })
}

/// Copy a directory tree recursively, returns (files_copied, bytes_copied).
///
/// Existing files at the destination are overwritten; empty directories
/// are recreated.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(u64, u64), BuildError> {
    if !src.is_dir() {
        return Err(BuildError::SourceNotFound {
            path: src.to_path_buf(),
        });
    }

    info!("Copying files from {} to {}", src.display(), dst.display());

    let mut files_copied = 0u64;
    let mut bytes_copied = 0u64;

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let src_path = entry.path();
        let relative = src_path.strip_prefix(src).unwrap_or(src_path);
        let dst_path = dst.join(relative);

        if entry.file_type().is_dir() {
            create_dir(&dst_path)?;
            continue;
        }

        if !entry.file_type().is_file() {
            continue;
        }

        let bytes = copy_file(src_path, &dst_path)?;
        files_copied += 1;
        bytes_copied += bytes;
    }

    debug!(files = files_copied, bytes = bytes_copied, "copy finished");
    Ok((files_copied, bytes_copied))
}

/// Remove a single file or a whole tree. Missing paths are ignored.
pub fn remove_path(path: &Path) -> Result<(), BuildError> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            debug!(path = %path.display(), "removed");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::RemoveFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Recursively and forcibly delete a directory
pub fn delete_directory(dir: &Path) -> Result<(), BuildError> {
    info!("Deleting contents of {}", dir.display());
    remove_path(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_creates_parent() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("source.txt");
        let dst = temp.path().join("a/b/c/dest.txt");
        fs::write(&src, "hello").unwrap();

        let bytes = copy_file(&src, &dst).unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "hello");
    }

    #[test]
    fn test_copy_file_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = copy_file(&temp.path().join("nope"), &temp.path().join("out"));
        assert!(matches!(result, Err(BuildError::CopyFailed { .. })));
    }

    #[test]
    fn test_copy_tree_recursive() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("js/lib")).unwrap();
        fs::create_dir_all(src.join("empty")).unwrap();
        fs::write(src.join("manifest.json"), "{}").unwrap();
        fs::write(src.join("js/lib/util.js"), "var a = 1;").unwrap();

        let dst = temp.path().join("build");
        let (files, bytes) = copy_tree(&src, &dst).unwrap();

        assert_eq!(files, 2);
        assert_eq!(bytes, 12);
        assert!(dst.join("manifest.json").is_file());
        assert!(dst.join("js/lib/util.js").is_file());
        assert!(dst.join("empty").is_dir());
    }

    #[test]
    fn test_copy_tree_overwrites_stale_files() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("build");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("script.js"), "new").unwrap();
        fs::write(dst.join("script.js"), "stale").unwrap();

        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("script.js")).unwrap(), "new");
    }

    #[test]
    fn test_copy_tree_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = copy_tree(&temp.path().join("missing"), &temp.path().join("build"));
        assert!(matches!(result, Err(BuildError::SourceNotFound { .. })));
    }

    #[test]
    fn test_delete_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("build");
        fs::create_dir_all(dir.join("a/b")).unwrap();
        fs::write(dir.join("a/b/file.txt"), "x").unwrap();

        delete_directory(&dir).unwrap();

        assert!(!dir.exists());
    }

    #[test]
    fn test_delete_directory_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(delete_directory(&temp.path().join("missing")).is_ok());
    }

    #[test]
    fn test_remove_path_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("variables.css");
        fs::write(&file, "x").unwrap();

        remove_path(&file).unwrap();

        assert!(!file.exists());
    }
}
