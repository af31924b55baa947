//! Build pipeline orchestration.
//!
//! A build is a fixed, strictly sequential list of [`Step`]s run against one
//! working directory. The first failing step aborts the build; the working
//! directory is left as it was at the point of failure and must be cleared
//! before the next run.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info};

use crate::archive::archive_directory;
use crate::config::Config;
use crate::copier::{copy_tree, delete_directory};
use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::images::{compress_images, delete_template_images};
use crate::mode::BuildMode;
use crate::placeholder::{substitute_placeholders, PlaceholderMap};
use crate::scripts::{minify_scripts, transpile_scripts};
use crate::styles::{compile_styles, delete_style_sources, minify_styles};

/// One stage of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    LoadEnvironment,
    CopySources,
    SubstitutePlaceholders,
    CompileStyles,
    DeleteStyleSources,
    DeleteTemplateImages,
    CompressImages,
    TranspileScripts { debug: bool },
    MinifyStyles { debug: bool },
    MinifyScripts { debug: bool },
    Archive,
    DeleteWorkingDir,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::LoadEnvironment => "load environment",
            Step::CopySources => "copy sources",
            Step::SubstitutePlaceholders => "substitute placeholders",
            Step::CompileStyles => "compile styles",
            Step::DeleteStyleSources => "delete style sources",
            Step::DeleteTemplateImages => "delete template images",
            Step::CompressImages => "compress images",
            Step::TranspileScripts { .. } => "transpile scripts",
            Step::MinifyStyles { .. } => "minify styles",
            Step::MinifyScripts { .. } => "minify scripts",
            Step::Archive => "archive",
            Step::DeleteWorkingDir => "delete working directory",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steps of a build, in order.
///
/// Development builds skip script minification.
pub fn steps_for(mode: BuildMode, compress: bool) -> Vec<Step> {
    let debug = mode.is_debug();

    let mut steps = vec![
        Step::LoadEnvironment,
        Step::CopySources,
        Step::SubstitutePlaceholders,
        Step::CompileStyles,
        Step::DeleteStyleSources,
        Step::DeleteTemplateImages,
    ];
    if compress {
        steps.push(Step::CompressImages);
    }
    steps.push(Step::TranspileScripts { debug });
    steps.push(Step::MinifyStyles { debug });
    if mode == BuildMode::Production {
        steps.push(Step::MinifyScripts { debug });
    }
    steps.push(Step::Archive);
    steps.push(Step::DeleteWorkingDir);
    steps
}

/// A failed build: which step broke and why
#[derive(Error, Debug)]
#[error("build step '{step}' failed: {source}")]
pub struct PipelineError {
    pub step: Step,
    #[source]
    pub source: BuildError,
}

/// Wall time of one completed step
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub step: Step,
    pub duration: Duration,
}

/// Summary of a successful build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub widget_code: String,
    pub archive: PathBuf,
    pub steps: Vec<StepTiming>,
    pub duration: Duration,
}

/// What later steps need from the loaded environment
#[derive(Debug, Default)]
struct BuildState {
    placeholders: PlaceholderMap,
    widget_code: String,
}

fn execute(step: Step, config: &Config, state: &mut BuildState) -> Result<(), BuildError> {
    let work = config.build_dir.as_path();

    match step {
        Step::LoadEnvironment => {
            let env = BuildEnv::load(&config.env_file(), config.mode)?;
            state.placeholders = PlaceholderMap::from_env(&env);
            state.widget_code = env.amocrm_widget_code;
            info!(
                "Starting {} build of widget {}",
                config.mode.label(),
                state.widget_code
            );
        }
        Step::CopySources => {
            copy_tree(&config.source_dir, work)?;
        }
        Step::SubstitutePlaceholders => {
            substitute_placeholders(work, &state.placeholders)?;
        }
        Step::CompileStyles => {
            compile_styles(work)?;
        }
        Step::DeleteStyleSources => delete_style_sources(work)?,
        Step::DeleteTemplateImages => {
            delete_template_images(work)?;
        }
        Step::CompressImages => {
            compress_images(work)?;
        }
        Step::TranspileScripts { debug } => {
            transpile_scripts(work, debug)?;
        }
        Step::MinifyStyles { debug } => {
            minify_styles(work, debug)?;
        }
        Step::MinifyScripts { debug } => {
            minify_scripts(work, debug)?;
        }
        Step::Archive => {
            archive_directory(work, &config.project_root, &config.archive_name)?;
        }
        Step::DeleteWorkingDir => delete_directory(work)?,
    }

    Ok(())
}

/// Run a full build, calling `on_step` before each step with its position
/// and the total step count
pub fn run_build_with<F>(config: &Config, mut on_step: F) -> Result<BuildReport, PipelineError>
where
    F: FnMut(usize, usize, Step),
{
    let start = Instant::now();
    let steps = steps_for(config.mode, config.compress_images);
    let total = steps.len();

    let mut state = BuildState::default();
    let mut timings = Vec::with_capacity(total);
    for (idx, step) in steps.into_iter().enumerate() {
        on_step(idx, total, step);
        let step_start = Instant::now();

        if let Err(source) = execute(step, config, &mut state) {
            error!("Step '{step}' failed: {source}");
            return Err(PipelineError { step, source });
        }

        timings.push(StepTiming {
            step,
            duration: step_start.elapsed(),
        });
    }

    info!("Finished building widget {}", state.widget_code);

    Ok(BuildReport {
        mode: config.mode,
        widget_code: state.widget_code,
        archive: config.archive_path(),
        steps: timings,
        duration: start.elapsed(),
    })
}

/// Run a full build
pub fn run_build(config: &Config) -> Result<BuildReport, PipelineError> {
    run_build_with(config, |_, _, _| {})
}
