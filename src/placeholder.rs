//! Placeholder substitution.
//!
//! Source files carry fixed `%name%` tokens that are filled in from the
//! build environment. A token may appear quoted (`'%app_domain%'`) where a
//! string literal is expected, or bare where the value is spliced in as-is,
//! so the quoted forms are replaced first and the bare form afterwards.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{parse_bool, BuildEnv};
use crate::error::BuildError;
use crate::scanner::find_files;

/// File types that may contain placeholders
pub const SUBSTITUTED_EXTENSIONS: &[&str] = &["js", "json", "scss"];

/// One token and its replacements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Token including the surrounding percent signs
    pub token: &'static str,
    /// Raw value used for the bare form
    pub value: String,
    /// Literal used for the quoted forms; `None` quotes `value`
    pub literal: Option<String>,
}

impl Placeholder {
    fn new(token: &'static str, value: impl Into<String>) -> Self {
        Self {
            token,
            value: value.into(),
            literal: None,
        }
    }

    /// Replace every quoted and bare occurrence of the token in `text`
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for quote in ['\'', '"'] {
            let quoted = format!("{quote}{}{quote}", self.token);
            if !out.contains(&quoted) {
                continue;
            }
            let replacement = match &self.literal {
                Some(literal) => literal.clone(),
                None => format!("{quote}{}{quote}", self.value),
            };
            out = out.replace(&quoted, &replacement);
        }
        out.replace(self.token, &self.value)
    }
}

/// The fixed set of tokens bound to one build environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    entries: Vec<Placeholder>,
}

impl PlaceholderMap {
    pub fn from_env(env: &BuildEnv) -> Self {
        let raw_free = env.app_free.clone().unwrap_or_default();
        let free = Placeholder {
            token: "%app_free%",
            value: raw_free,
            literal: Some(parse_bool(env.app_free.as_deref()).to_string()),
        };

        Self {
            entries: vec![
                Placeholder::new("%app_env%", env.mode.label()),
                Placeholder::new("%app_domain%", env.app_domain.as_str()),
                Placeholder::new("%app_widget_code%", env.app_widget_code.as_str()),
                Placeholder::new("%amocrm_widget_code%", env.amocrm_widget_code.as_str()),
                free,
                Placeholder::new("%app_version%", env.app_version.as_str()),
            ],
        }
    }

    pub fn entries(&self) -> &[Placeholder] {
        &self.entries
    }

    /// Substitute every token in `text`
    pub fn apply(&self, text: &str) -> String {
        self.entries
            .iter()
            .fold(text.to_string(), |acc, p| p.apply(&acc))
    }
}

/// Rewrite every script, JSON and SCSS file under `dir` in place.
///
/// All matching files are rewritten, changed or not, so their modification
/// times reflect the build. Returns the number of files processed.
pub fn substitute_placeholders(dir: &Path, map: &PlaceholderMap) -> Result<usize, BuildError> {
    info!("Setting placeholder variables in {}", dir.display());

    let files = find_files(dir, SUBSTITUTED_EXTENSIONS)?;
    for path in &files {
        let content = fs::read_to_string(path).map_err(|e| BuildError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;
        let replaced = map.apply(&content);
        if replaced != content {
            debug!(path = %path.display(), "placeholders replaced");
        }
        fs::write(path, replaced).map_err(|e| BuildError::write_failed(path.clone(), e))?;
    }

    Ok(files.len())
}
