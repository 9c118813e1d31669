//! Driver configuration.
//!
//! One TOML file describes one interop library:
//!
//! ```toml
//! index = "sqlite.json"
//! module_name = "sqlite"
//! package = "sqlite"
//! mode = "metadata"          # or "textual"
//! includes = ["sqlite3.h"]
//! depends = ["stdlib"]
//!
//! [imports]
//! FILE = "posix"
//!
//! [output]
//! library = "build/sqlite.klib"
//! glue = "build/sqlite-glue.c"
//!
//! [toolchain]
//! command = "clang"
//! ```
//!
//! Relative paths are resolved against the directory of the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cinterop_gen::{GenerationMode, InteropConfig, NativeLibrary, UnsupportedPolicy};
use cinterop_ir::Language;
use serde::Deserialize;

use crate::error::DriverError;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Native index produced by the header indexer (JSON).
    pub index: PathBuf,
    pub module_name: String,
    /// Host package of the generated declarations.
    pub package: String,
    pub mode: GenerationMode,
    /// Native function the generated `main` shim calls.
    pub entry_point: Option<String>,
    pub policy: UnsupportedPolicy,
    pub includes: Vec<String>,
    /// Extra lines placed after the includes of the glue file.
    pub preamble: Vec<String>,
    /// Foreign spelling → package of a library that already binds it.
    pub imports: BTreeMap<String, String>,
    /// Libraries this one depends on.
    pub depends: Vec<String>,
    /// Native libraries the glue must be linked with.
    pub link_libraries: Vec<String>,
    pub export_forward_declarations: Vec<String>,
    /// Metadata only: the library carries no compiled bodies.
    pub noir: bool,
    pub output: OutputConfig,
    pub toolchain: Option<ToolchainConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub library: PathBuf,
    pub glue: PathBuf,
    /// Host source file; required in textual mode.
    pub bindings: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl DriverConfig {
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        let text = fs::read_to_string(path).map_err(|e| DriverError::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_toml(&text, base)
    }

    /// Parse, resolve relative paths against `base`, and validate.
    pub fn from_toml(text: &str, base: &Path) -> Result<Self, DriverError> {
        let mut config: DriverConfig = toml::from_str(text)?;
        config.resolve_paths(base);
        config.validate()?;
        tracing::debug!(module = %config.module_name, mode = ?config.mode, "loaded configuration");
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if !path.as_os_str().is_empty() && path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.index);
        resolve(&mut self.output.library);
        resolve(&mut self.output.glue);
        if let Some(bindings) = &mut self.output.bindings {
            resolve(bindings);
        }
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        if self.module_name.is_empty() {
            return Err(DriverError::Config("`module_name` is required".to_owned()));
        }
        if !is_package_name(&self.package) {
            return Err(DriverError::Config(format!(
                "`{}` is not a valid package name",
                self.package
            )));
        }
        if self.index.as_os_str().is_empty() {
            return Err(DriverError::Config("`index` is required".to_owned()));
        }
        if self.output.library.as_os_str().is_empty() {
            return Err(DriverError::Config("`output.library` is required".to_owned()));
        }
        if self.output.glue.as_os_str().is_empty() {
            return Err(DriverError::Config("`output.glue` is required".to_owned()));
        }
        if self.mode == GenerationMode::Textual && self.output.bindings.is_none() {
            return Err(DriverError::Config(
                "textual mode needs `output.bindings`".to_owned(),
            ));
        }
        if let Some(toolchain) = &self.toolchain {
            if toolchain.command.is_empty() {
                return Err(DriverError::Config(
                    "`toolchain.command` must not be empty".to_owned(),
                ));
            }
        }
        Ok(())
    }

    pub fn interop_config(&self) -> InteropConfig {
        InteropConfig {
            package: self.package.clone(),
            imports: self
                .imports
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            policy: self.policy,
            export_forward_declarations: self.export_forward_declarations.clone(),
        }
    }

    pub fn native_library(&self, language: Language) -> NativeLibrary {
        NativeLibrary {
            language,
            includes: self.includes.clone(),
            additional_preamble_lines: self.preamble.clone(),
        }
    }
}

fn is_package_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
