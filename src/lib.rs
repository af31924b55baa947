//! # Widget Builder
//!
//! Build pipeline that turns a widget source tree into a distributable
//! archive.
//!
//! A build copies the sources into a working directory, fills in
//! environment placeholders, compiles SCSS, transpiles and minifies
//! scripts and stylesheets, optionally recompresses images, and zips the
//! result into the project root.
//!
//! ## Features
//!
//! - Production and development build sequences
//! - SCSS compilation (grass) and CSS minification (lightningcss)
//! - ES5 transpilation and script minification (swc)
//! - Lossless image recompression
//! - Parallel per-file work using Rayon
//!
//! ## Usage
//!
//! ```ignore
//! use widget_builder::config::Config;
//! use widget_builder::mode::BuildMode;
//! use widget_builder::pipeline::run_build;
//!
//! let report = run_build(&Config::new(BuildMode::Production, "/app"))?;
//! ```

/// Zip archive creation
pub mod archive;

/// CLI configuration and argument parsing
pub mod config;

/// Directory copy and removal
pub mod copier;

/// Env file loading and boolean flag parsing
pub mod env;

/// Error types for build operations
pub mod error;

/// Image template removal and compression
pub mod images;

/// Build mode selection
pub mod mode;

/// Build step sequencing
pub mod pipeline;

/// Environment placeholder substitution
pub mod placeholder;

/// File discovery in the working directory
pub mod scanner;

/// Script transpilation and minification
pub mod scripts;

/// SCSS compilation and CSS minification
pub mod styles;
