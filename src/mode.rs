//! Build mode selection.

use std::fmt;

/// Build mode: selects the env file, the placeholder label and how
/// aggressively scripts and styles are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildMode {
    Production,
    Development,
}

impl BuildMode {
    /// Full mode name as used for the CLI subcommands
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Production => "production",
            BuildMode::Development => "development",
        }
    }

    /// Short label substituted for `%app_env%`
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            BuildMode::Production => "prod",
            BuildMode::Development => "dev",
        }
    }

    #[inline]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "production" | "prod" => Some(BuildMode::Production),
            "development" | "dev" => Some(BuildMode::Development),
            _ => None,
        }
    }

    /// Env file name, relative to the project root
    #[inline]
    pub fn env_file_name(&self) -> &'static str {
        match self {
            BuildMode::Production => ".env.prod",
            BuildMode::Development => ".env",
        }
    }

    /// Debug builds keep comments and modern syntax and print readable CSS
    #[inline]
    pub fn is_debug(&self) -> bool {
        matches!(self, BuildMode::Development)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
