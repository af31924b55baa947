use std::path::PathBuf;
use thiserror::Error;

/// Build error types
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("No space left on device for {path}")]
    DiskFull { path: PathBuf },

    #[error("Failed to copy {src} to {dst}")]
    CopyFailed {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory: {path}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk directory tree")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to load env file {path}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("SCSS compilation failed for {path}: {message}")]
    StyleCompile { path: PathBuf, message: String },

    #[error("CSS minification failed for {path}: {message}")]
    StyleMinify { path: PathBuf, message: String },

    #[error("Script processing failed for {path}: {message}")]
    Script { path: PathBuf, message: String },

    #[error("Image compression failed for {path}: {message}")]
    Image { path: PathBuf, message: String },

    #[error("Failed to write archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl BuildError {
    /// Map an I/O error from writing `path`, promoting ENOSPC to `DiskFull`
    pub(crate) fn write_failed(path: PathBuf, source: std::io::Error) -> Self {
        // ENOSPC on Unix
        if source.raw_os_error() == Some(28) {
            return BuildError::DiskFull { path };
        }
        BuildError::WriteFailed { path, source }
    }
}
