use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::BuildError;

/// Archive name used when none is given
pub const DEFAULT_ARCHIVE_NAME: &str = "widget.zip";

/// Entry name inside the archive: relative, always `/`-separated
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Zip the full tree under `src` into `dst_dir/name`, returning the archive path.
///
/// An existing archive with the same name is replaced.
pub fn archive_directory(src: &Path, dst_dir: &Path, name: &str) -> Result<PathBuf, BuildError> {
    let archive_path = dst_dir.join(name);
    info!("Archiving widget into {}", archive_path.display());

    let to_err = |source| BuildError::Archive {
        path: archive_path.clone(),
        source,
    };

    if !src.is_dir() {
        return Err(BuildError::SourceNotFound {
            path: src.to_path_buf(),
        });
    }
    fs::create_dir_all(dst_dir).map_err(|e| BuildError::CreateDirFailed {
        path: dst_dir.to_path_buf(),
        source: e,
    })?;

    let file = File::create(&archive_path)
        .map_err(|e| BuildError::write_failed(archive_path.clone(), e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut entries = 0usize;
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let Some(name) = entry_name(src, entry.path()) else {
            continue;
        };

        if entry.file_type().is_dir() {
            zip.add_directory(name, options.unix_permissions(0o755))
                .map_err(to_err)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options).map_err(to_err)?;
            let mut input = File::open(entry.path()).map_err(|e| BuildError::ReadFailed {
                path: entry.path().to_path_buf(),
                source: e,
            })?;
            io::copy(&mut input, &mut zip)
                .map_err(|e| BuildError::write_failed(archive_path.clone(), e))?;
            entries += 1;
        }
    }

    zip.finish().map_err(to_err)?;
    debug!(files = entries, "archive written");

    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_archive_directory_contains_tree() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("build");
        fs::create_dir_all(src.join("images")).unwrap();
        fs::write(src.join("script.js"), "define([], function () {});").unwrap();
        fs::write(src.join("images/logo.svg"), "<svg/>").unwrap();

        let out = archive_directory(&src, temp.path(), DEFAULT_ARCHIVE_NAME).unwrap();

        assert_eq!(out, temp.path().join("widget.zip"));
        let mut zip = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let names: Vec<String> = zip.file_names().map(str::to_string).collect();
        assert!(names.contains(&"script.js".to_string()));
        assert!(names.contains(&"images/logo.svg".to_string()));
        assert!(names.contains(&"images/".to_string()));

        let mut content = String::new();
        zip.by_name("script.js")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "define([], function () {});");
    }

    #[test]
    fn test_archive_directory_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("build");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.js"), "1").unwrap();
        fs::write(temp.path().join("custom.zip"), "stale").unwrap();

        let out = archive_directory(&src, temp.path(), "custom.zip").unwrap();

        let zip = ZipArchive::new(File::open(out).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
    }

    #[test]
    fn test_archive_directory_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = archive_directory(&temp.path().join("missing"), temp.path(), "w.zip");
        assert!(matches!(result, Err(BuildError::SourceNotFound { .. })));
        assert!(!temp.path().join("w.zip").exists());
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let root = Path::new("/tmp/widget");
        assert_eq!(
            entry_name(root, Path::new("/tmp/widget/i18n/ru.json")),
            Some("i18n/ru.json".to_string())
        );
        assert_eq!(entry_name(root, root), None);
    }
}
