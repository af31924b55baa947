use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::BuildError;

/// Directory holding SCSS partials that are only ever imported
pub const PARTIALS_DIR: &str = "scss";

/// Directory holding widget images
pub const IMAGES_DIR: &str = "images";

/// Check a path's extension against a list, ignoring case
#[inline]
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// True if any directory between `root` and `path` is named `dir_name`
pub fn is_inside_dir(root: &Path, path: &Path, dir_name: &str) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let Some(parent) = relative.parent() else {
        return false;
    };

    parent.components().any(|c| match c {
        Component::Normal(name) => name == dir_name,
        _ => false,
    })
}

/// Collect all files below `root` (any depth) with one of `extensions`,
/// sorted by path
#[must_use = "this returns the matching files which should be processed"]
pub fn find_files(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Collect the files directly inside `dir` with one of `extensions`.
/// A missing directory yields no files.
pub fn find_files_shallow(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, BuildError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Collect every directory below `root` named `dir_name`, outermost first
pub fn find_dirs_named(root: &Path, dir_name: &str) -> Result<Vec<PathBuf>, BuildError> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir()
            && entry.file_name() == dir_name
            && !dirs.iter().any(|d| entry.path().starts_with(d))
        {
            dirs.push(entry.into_path());
        }
    }

    Ok(dirs)
}
