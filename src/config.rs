//! CLI configuration and runtime settings for widget builds.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::archive::DEFAULT_ARCHIVE_NAME;
use crate::mode::BuildMode;

/// Default project root holding the env files and the widget sources
pub const DEFAULT_PROJECT_ROOT: &str = "/app";

/// Widget sources, relative to the project root
pub const DEFAULT_SOURCE_DIR: &str = "assets/widget/src";

/// Scratch directory for intermediate build state
pub const DEFAULT_BUILD_DIR: &str = "/tmp/widget";

/// Build a distributable widget archive
#[derive(Parser, Debug)]
#[command(name = "widget-builder")]
#[command(version)]
#[command(about = "Build a distributable widget archive")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Project root containing the env files and the widget sources
    #[arg(long, global = true, default_value = DEFAULT_PROJECT_ROOT)]
    pub project_root: PathBuf,

    /// Widget source directory (relative paths resolve against the project root)
    #[arg(long, global = true, default_value = DEFAULT_SOURCE_DIR)]
    pub source: PathBuf,

    /// Working directory for intermediate build state
    #[arg(long, global = true, default_value = DEFAULT_BUILD_DIR)]
    pub build_dir: PathBuf,

    /// File name of the archive written to the project root
    #[arg(long, global = true, default_value = DEFAULT_ARCHIVE_NAME)]
    pub archive_name: String,

    /// Number of parallel workers for per-file work
    #[arg(short, long, global = true, default_value_t = num_cpus::get())]
    pub jobs: usize,

    /// Also recompress images in the images directory
    #[arg(long, global = true)]
    pub compress_images: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Named build targets
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Build for publication
    #[command(alias = "prod")]
    Production,
    /// Build during development
    #[command(alias = "dev")]
    Development,
}

impl From<Command> for BuildMode {
    fn from(command: Command) -> Self {
        match command {
            Command::Production => BuildMode::Production,
            Command::Development => BuildMode::Development,
        }
    }
}

/// Runtime configuration parsed from CLI
#[derive(Debug, Clone)]
pub struct Config {
    /// Production or development
    pub mode: BuildMode,
    /// Project root; the archive is written here
    pub project_root: PathBuf,
    /// Widget sources copied into the working directory
    pub source_dir: PathBuf,
    /// Working directory, deleted after a successful build
    pub build_dir: PathBuf,
    /// Archive file name
    pub archive_name: String,
    /// Number of parallel workers
    pub jobs: usize,
    /// Run image compression after template removal
    pub compress_images: bool,
    /// Enable verbose output
    pub verbose: bool,
}

impl Config {
    /// Configuration with the default layout below `project_root`
    pub fn new(mode: BuildMode, project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Config {
            mode,
            source_dir: project_root.join(DEFAULT_SOURCE_DIR),
            project_root,
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            jobs: 1,
            compress_images: false,
            verbose: false,
        }
    }

    /// Create Config from CLI arguments
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
        let source_dir = if cli.source.is_absolute() {
            cli.source
        } else {
            project_root.join(cli.source)
        };

        if !is_plain_file_name(&cli.archive_name) {
            anyhow::bail!("Invalid archive name: {}", cli.archive_name);
        }

        if project_root.starts_with(&cli.build_dir) || source_dir.starts_with(&cli.build_dir) {
            anyhow::bail!(
                "Build directory {} would contain the project or its sources",
                cli.build_dir.display()
            );
        }

        Ok(Config {
            mode: cli.command.into(),
            project_root,
            source_dir,
            build_dir: cli.build_dir,
            archive_name: cli.archive_name,
            jobs: cli.jobs.max(1),
            compress_images: cli.compress_images,
            verbose: cli.verbose,
        })
    }

    /// Env file for the configured mode
    pub fn env_file(&self) -> PathBuf {
        self.project_root.join(self.mode.env_file_name())
    }

    /// Final archive location
    pub fn archive_path(&self) -> PathBuf {
        self.project_root.join(&self.archive_name)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cli(command: Command, source: &str, build_dir: &str, archive_name: &str, jobs: usize) -> Cli {
        Cli {
            command,
            project_root: PathBuf::from("/nonexistent/project"),
            source: PathBuf::from(source),
            build_dir: PathBuf::from(build_dir),
            archive_name: archive_name.to_string(),
            jobs,
            compress_images: false,
            verbose: false,
        }
    }

    #[test]
    fn test_cli_parses_subcommands_and_aliases() {
        let cli = Cli::try_parse_from(["widget-builder", "prod"]).unwrap();
        assert_eq!(cli.command, Command::Production);

        let cli = Cli::try_parse_from(["widget-builder", "development", "--verbose"]).unwrap();
        assert_eq!(cli.command, Command::Development);
        assert!(cli.verbose);
        assert_eq!(cli.project_root, PathBuf::from(DEFAULT_PROJECT_ROOT));
        assert_eq!(cli.archive_name, "widget.zip");
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["widget-builder"]).is_err());
    }

    #[test]
    fn test_config_from_cli_basic() {
        let cli = make_cli(Command::Production, DEFAULT_SOURCE_DIR, "/tmp/widget", "widget.zip", 4);

        let config = Config::from_cli(cli).unwrap();

        assert_eq!(config.mode, BuildMode::Production);
        assert_eq!(
            config.source_dir,
            PathBuf::from("/nonexistent/project/assets/widget/src")
        );
        assert_eq!(config.env_file(), PathBuf::from("/nonexistent/project/.env.prod"));
        assert_eq!(config.archive_path(), PathBuf::from("/nonexistent/project/widget.zip"));
        assert_eq!(config.jobs, 4);
    }

    #[test]
    fn test_config_from_cli_development_env_file() {
        let cli = make_cli(Command::Development, DEFAULT_SOURCE_DIR, "/tmp/widget", "widget.zip", 4);
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.env_file(), PathBuf::from("/nonexistent/project/.env"));
    }

    #[test]
    fn test_config_from_cli_absolute_source() {
        let cli = make_cli(Command::Production, "/srv/widget", "/tmp/widget", "widget.zip", 4);
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("/srv/widget"));
    }

    #[test]
    fn test_config_from_cli_jobs_minimum_one() {
        let cli = make_cli(Command::Production, DEFAULT_SOURCE_DIR, "/tmp/widget", "widget.zip", 0);
        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_config_from_cli_rejects_archive_path() {
        let cli = make_cli(Command::Production, DEFAULT_SOURCE_DIR, "/tmp/widget", "../widget.zip", 4);
        assert!(Config::from_cli(cli).is_err());

        let cli = make_cli(Command::Production, DEFAULT_SOURCE_DIR, "/tmp/widget", "", 4);
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn test_config_from_cli_rejects_build_dir_over_project() {
        let cli = make_cli(Command::Production, DEFAULT_SOURCE_DIR, "/nonexistent", "widget.zip", 4);
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn test_config_new_defaults() {
        let config = Config::new(BuildMode::Development, "/app");

        assert_eq!(config.source_dir, PathBuf::from("/app/assets/widget/src"));
        assert_eq!(config.build_dir, PathBuf::from("/tmp/widget"));
        assert_eq!(config.archive_name, "widget.zip");
        assert!(!config.compress_images);
    }
}
