//! Environment configuration for a build.
//!
//! Values come from the mode's INI-style env file: `KEY=VALUE` lines, with
//! `;` or `#` comments and `[section]` headers ignored. A key absent
//! from the file falls back to the process environment; a key absent from
//! both resolves to an empty string.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::mode::BuildMode;

pub const APP_DOMAIN: &str = "APP_DOMAIN";
pub const APP_WIDGET_CODE: &str = "APP_WIDGET_CODE";
pub const AMOCRM_WIDGET_CODE: &str = "AMOCRM_WIDGET_CODE";
pub const APP_FREE: &str = "APP_FREE";
pub const APP_VERSION: &str = "APP_VERSION";

/// Parse a permissive boolean flag.
///
/// `false`, `f`, `no`, `n` and any run of zeros (case-insensitive) are false,
/// as is an empty or unset value. Everything else is true.
pub fn parse_bool(value: Option<&str>) -> bool {
    static FALSY: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let falsy = FALSY
        .get_or_init(|| Regex::new(r"(?i)^(?:f(?:alse)?|no?|0+)$").expect("valid falsy pattern"));

    match value {
        None => false,
        Some(v) if v.is_empty() => false,
        Some(v) => !falsy.is_match(v),
    }
}

/// Blank out the INI-only lines dotenv syntax does not know about, keeping
/// line numbers stable for parse errors
fn ini_assignments(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with(';') || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolved environment for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    pub mode: BuildMode,
    pub app_domain: String,
    pub app_widget_code: String,
    pub amocrm_widget_code: String,
    /// Raw free-tier flag; `None` when unset everywhere
    pub app_free: Option<String>,
    pub app_version: String,
}

impl BuildEnv {
    /// Load the env file at `path`, falling back to the process environment
    pub fn load(path: &Path, mode: BuildMode) -> Result<Self, BuildError> {
        let to_err = |source| BuildError::EnvFile {
            path: path.to_path_buf(),
            source,
        };

        let content = fs::read_to_string(path).map_err(|e| to_err(dotenvy::Error::Io(e)))?;

        let mut vars = HashMap::new();
        for item in dotenvy::from_read_iter(ini_assignments(&content).as_bytes()) {
            let (key, value) = item.map_err(to_err)?;
            vars.insert(key, value);
        }
        debug!(path = %path.display(), keys = vars.len(), "loaded env file");

        Ok(Self::from_lookup(mode, |key| {
            vars.get(key).cloned().or_else(|| std::env::var(key).ok())
        }))
    }

    /// Build from an explicit variable lookup
    pub fn from_lookup<F>(mode: BuildMode, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).unwrap_or_else(|| {
                warn!(key, "environment variable not set, substituting empty string");
                String::new()
            })
        };

        BuildEnv {
            mode,
            app_domain: required(APP_DOMAIN),
            app_widget_code: required(APP_WIDGET_CODE),
            amocrm_widget_code: required(AMOCRM_WIDGET_CODE),
            app_free: lookup(APP_FREE),
            app_version: required(APP_VERSION),
        }
    }

    /// Whether the widget is built for the free tier
    pub fn is_free(&self) -> bool {
        parse_bool(self.app_free.as_deref())
    }
}
