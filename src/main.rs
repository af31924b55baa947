use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;
use tracing_subscriber::EnvFilter;

use widget_builder::config::{Cli, Config};
use widget_builder::pipeline::run_build_with;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("widget_builder={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_cli(cli)?;

    init_logging(config.verbose);

    // Configure Rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build_global()
        .ok();

    // Setup progress bar (only in verbose mode)
    let progress = if config.verbose {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let result = run_build_with(&config, |idx, total, step| {
        if let Some(ref pb) = progress {
            pb.set_length(total as u64);
            pb.set_position(idx as u64);
            pb.set_message(step.as_str());
        }
    });

    match result {
        Ok(report) => {
            if let Some(pb) = progress {
                pb.finish_with_message("Complete");
            }

            println!(
                "Built {} widget {} in {:.2}s: {}",
                report.mode,
                report.widget_code,
                report.duration.as_secs_f64(),
                report.archive.display()
            );
            if config.verbose {
                for timing in &report.steps {
                    println!(
                        "  {}: {:.2}s",
                        timing.step,
                        timing.duration.as_secs_f64()
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            if let Some(pb) = progress {
                pb.abandon_with_message("Failed");
            }

            error!(
                "Build aborted; working directory {} was left in place",
                config.build_dir.display()
            );
            eprintln!("Error: {e}");
            Ok(ExitCode::from(1))
        }
    }
}
