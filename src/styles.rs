//! Stylesheet operations: SCSS compilation, source cleanup and CSS minification.

use std::fs;
use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::copier::remove_path;
use crate::error::BuildError;
use crate::scanner::{find_dirs_named, find_files, is_inside_dir, PARTIALS_DIR};

/// Legacy artifacts that only exist to feed SCSS builds
const LEGACY_STYLE_ARTIFACTS: &[&str] = &["css/common", "css/variables.css"];

/// SCSS files that compile to their own stylesheet: not inside a partials
/// directory and not `_`-prefixed partials
pub fn style_entry_points(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let files = find_files(dir, &["scss"])?;
    Ok(files
        .into_iter()
        .filter(|p| !is_inside_dir(dir, p, PARTIALS_DIR))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| !n.starts_with('_'))
                .unwrap_or(false)
        })
        .collect())
}

fn compile_one(path: &Path, root: &Path) -> Result<PathBuf, BuildError> {
    let options = grass::Options::default().load_path(root);
    let css = grass::from_path(path, &options).map_err(|e| BuildError::StyleCompile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let out = path.with_extension("css");
    fs::write(&out, css).map_err(|e| BuildError::write_failed(out.clone(), e))?;
    debug!(src = %path.display(), dst = %out.display(), "compiled");
    Ok(out)
}

/// Compile SCSS entry points under `dir` into sibling `.css` files.
///
/// A tree without entry points is left untouched. Returns the written files.
pub fn compile_styles(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    info!("Compiling SCSS");

    let sources = style_entry_points(dir)?;
    if sources.is_empty() {
        debug!("no SCSS entry points, nothing to compile");
        return Ok(Vec::new());
    }

    sources
        .par_iter()
        .map(|path| compile_one(path, dir))
        .collect()
}

/// Remove SCSS sources, partial directories and the legacy style artifacts
pub fn delete_style_sources(dir: &Path) -> Result<(), BuildError> {
    info!("Deleting SCSS sources");

    for partials in find_dirs_named(dir, PARTIALS_DIR)? {
        remove_path(&partials)?;
    }
    for source in find_files(dir, &["scss"])? {
        remove_path(&source)?;
    }
    for artifact in LEGACY_STYLE_ARTIFACTS {
        remove_path(&dir.join(artifact))?;
    }

    Ok(())
}

/// Size of one stylesheet before and after minification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifyStats {
    pub path: PathBuf,
    pub original_size: usize,
    pub minified_size: usize,
}

/// Minify CSS source text. Debug output keeps the structural compression
/// but is printed readably instead of collapsed onto one line.
pub fn minify_css(code: &str, filename: &str, debug: bool) -> Result<String, String> {
    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };
    let mut sheet = StyleSheet::parse(code, options).map_err(|e| e.to_string())?;
    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| e.to_string())?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: !debug,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    Ok(printed.code)
}

fn minify_one(path: &Path, debug: bool) -> Result<MinifyStats, BuildError> {
    let code = fs::read_to_string(path).map_err(|e| BuildError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let minified = minify_css(&code, &path.display().to_string(), debug).map_err(|message| {
        BuildError::StyleMinify {
            path: path.to_path_buf(),
            message,
        }
    })?;

    fs::write(path, &minified).map_err(|e| BuildError::write_failed(path.to_path_buf(), e))?;

    Ok(MinifyStats {
        path: path.to_path_buf(),
        original_size: code.len(),
        minified_size: minified.len(),
    })
}

/// Minify every `.css` file under `dir` in place, logging sizes per file
pub fn minify_styles(dir: &Path, debug: bool) -> Result<Vec<MinifyStats>, BuildError> {
    info!("Minifying CSS");

    let files = find_files(dir, &["css"])?;
    let stats: Vec<MinifyStats> = files
        .par_iter()
        .map(|path| minify_one(path, debug))
        .collect::<Result<_, _>>()?;

    for s in &stats {
        info!(
            "File {} size before minification: {} bytes",
            s.path.display(),
            s.original_size
        );
        info!(
            "File {} size after minification: {} bytes",
            s.path.display(),
            s.minified_size
        );
    }

    Ok(stats)
}
