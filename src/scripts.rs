//! Script transpilation and minification.
//!
//! Transpilation and compression drive the swc compiler with option sets
//! written in its `.swcrc` / terser vocabulary. Every result is reprinted
//! through the code generator so the shipped scripts stay readable.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use swc_core::base::config::{JsMinifyOptions, Options};
use swc_core::base::{try_with_handler, Compiler, HandlerOpts, TransformOutput};
use swc_core::common::comments::{Comments, SingleThreadedComments};
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, Globals, SourceMap, GLOBALS};
use swc_core::ecma::ast::EsVersion;
use swc_core::ecma::codegen::text_writer::JsWriter;
use swc_core::ecma::codegen::Emitter;
use swc_core::ecma::parser::{parse_file_as_script, Syntax};
use tracing::{debug, info};

use crate::error::BuildError;
use crate::scanner::find_files;

/// Transpile options. Release builds target ES5; debug builds keep the
/// source syntax level.
pub fn transpile_options(debug: bool) -> Value {
    let target = if debug { "esnext" } else { "es5" };
    json!({
        "swcrc": false,
        "isModule": false,
        "jsc": {
            "parser": { "syntax": "ecmascript" },
            "target": target
        },
        "minify": false
    })
}

/// Compression for public widgets: no function inlining, no name mangling
pub fn minify_options() -> Value {
    json!({
        "compress": { "inline": false },
        "mangle": false
    })
}

enum ScriptJob<'a> {
    Transpile(&'a Options),
    Minify(&'a JsMinifyOptions),
}

fn script_error(name: &Path, message: String) -> BuildError {
    BuildError::Script {
        path: name.to_path_buf(),
        message,
    }
}

fn run_compiler(name: &Path, source: String, job: ScriptJob<'_>) -> Result<String, BuildError> {
    let cm: Lrc<SourceMap> = Default::default();
    let compiler = Compiler::new(cm.clone());

    let output: TransformOutput = GLOBALS
        .set(&Globals::new(), || {
            try_with_handler(cm.clone(), HandlerOpts::default(), |handler| {
                let fm = cm.new_source_file(FileName::Custom(name.display().to_string()), source);
                match job {
                    ScriptJob::Transpile(opts) => compiler.process_js_file(fm, handler, opts),
                    ScriptJob::Minify(opts) => compiler.minify(fm, handler, opts),
                }
            })
        })
        .map_err(|e| script_error(name, format!("{e:#}")))?;

    Ok(output.code)
}

/// Parse `source` and print it back unminified, one statement per line.
///
/// Comments survive only when `keep_comments` is set.
fn reprint(name: &Path, source: String, keep_comments: bool) -> Result<String, BuildError> {
    let cm: Lrc<SourceMap> = Default::default();
    let store = SingleThreadedComments::default();
    let comments: Option<&dyn Comments> = if keep_comments { Some(&store) } else { None };

    GLOBALS.set(&Globals::new(), || {
        let fm = cm.new_source_file(FileName::Custom(name.display().to_string()), source);
        let mut recovered = Vec::new();
        let script = parse_file_as_script(
            &fm,
            Syntax::Es(Default::default()),
            EsVersion::latest(),
            comments,
            &mut recovered,
        )
        .map_err(|e| script_error(name, e.kind().msg().into_owned()))?;

        let mut cfg = swc_core::ecma::codegen::Config::default();
        cfg.minify = false;

        let mut buf = Vec::new();
        {
            let mut emitter = Emitter {
                cfg,
                cm: cm.clone(),
                comments,
                wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
            };
            emitter
                .emit_script(&script)
                .map_err(|e| script_error(name, e.to_string()))?;
        }

        String::from_utf8(buf).map_err(|e| script_error(name, e.to_string()))
    })
}

fn parse_options<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, BuildError> {
    serde_json::from_value(value).map_err(|e| BuildError::Script {
        path: Default::default(),
        message: format!("invalid compiler options: {e}"),
    })
}

/// Transpiler settings resolved once per run
pub struct Transpiler {
    options: Options,
    strip_comments: bool,
}

impl Transpiler {
    /// Release transpilation also strips comments; debug keeps them
    pub fn new(debug: bool) -> Result<Self, BuildError> {
        Ok(Self {
            options: parse_options(transpile_options(debug))?,
            strip_comments: !debug,
        })
    }

    pub fn transpile(&self, name: &Path, source: &str) -> Result<String, BuildError> {
        let code = run_compiler(name, source.to_string(), ScriptJob::Transpile(&self.options))?;
        if self.strip_comments {
            reprint(name, code, false)
        } else {
            Ok(code)
        }
    }
}

/// Minifier settings resolved once per run.
///
/// Debug builds only reprint the source with its comments; release builds
/// compress first and drop comments.
pub struct Minifier {
    compress: Option<JsMinifyOptions>,
}

impl Minifier {
    pub fn new(debug: bool) -> Result<Self, BuildError> {
        let compress = if debug {
            None
        } else {
            Some(parse_options(minify_options())?)
        };
        Ok(Self { compress })
    }

    pub fn minify(&self, name: &Path, source: &str) -> Result<String, BuildError> {
        match &self.compress {
            Some(opts) => {
                let code = run_compiler(name, source.to_string(), ScriptJob::Minify(opts))?;
                reprint(name, code, false)
            }
            None => reprint(name, source.to_string(), true),
        }
    }
}

/// Transpile a single script's source text
pub fn transpile_source(name: &Path, source: &str, debug: bool) -> Result<String, BuildError> {
    Transpiler::new(debug)?.transpile(name, source)
}

/// Minify a single script's source text
pub fn minify_source(name: &Path, source: &str, debug: bool) -> Result<String, BuildError> {
    Minifier::new(debug)?.minify(name, source)
}

fn rewrite_scripts<F>(dir: &Path, mut transform: F) -> Result<usize, BuildError>
where
    F: FnMut(&Path, &str) -> Result<String, BuildError>,
{
    let files = find_files(dir, &["js"])?;
    for path in &files {
        let source = fs::read_to_string(path).map_err(|e| BuildError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;
        let code = transform(path, &source)?;
        fs::write(path, code).map_err(|e| BuildError::write_failed(path.clone(), e))?;
        debug!(path = %path.display(), "script rewritten");
    }
    Ok(files.len())
}

/// Transpile every `.js` file under `dir` in place
pub fn transpile_scripts(dir: &Path, is_debug: bool) -> Result<usize, BuildError> {
    info!("Transpiling scripts (debug: {is_debug})");

    let transpiler = Transpiler::new(is_debug)?;
    rewrite_scripts(dir, |path, source| transpiler.transpile(path, source))
}

/// Minify every `.js` file under `dir` in place
pub fn minify_scripts(dir: &Path, is_debug: bool) -> Result<usize, BuildError> {
    info!("Minifying scripts (debug: {is_debug})");

    let minifier = Minifier::new(is_debug)?;
    rewrite_scripts(dir, |path, source| minifier.minify(path, source))
}
