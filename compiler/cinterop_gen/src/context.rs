//! Inputs shared by every generation stage.

use cinterop_ir::{Language, NativeIndex};
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// What to do with a declaration that has no projection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Drop the declaration and report a diagnostic.
    #[default]
    Skip,
    /// Fail the whole build.
    Abort,
}

/// Form of the generated bindings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Host-language source text.
    Textual,
    /// Serialized package descriptors in a library container.
    #[default]
    Metadata,
}

/// The binding-relevant part of the interop configuration.
#[derive(Clone, Debug, Default)]
pub struct InteropConfig {
    /// Host package of the generated declarations.
    pub package: String,
    /// Foreign spelling → host package of a library that already binds it.
    pub imports: FxHashMap<String, String>,
    pub policy: UnsupportedPolicy,
    /// Extra forward declarations this library promises to resolve.
    pub export_forward_declarations: Vec<String>,
}

impl InteropConfig {
    pub fn new(package: impl Into<String>) -> Self {
        InteropConfig {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Package that already binds `spelling`, if it is imported.
    pub fn imported_package(&self, spelling: &str) -> Option<&str> {
        self.imports.get(spelling).map(String::as_str)
    }
}

/// Everything the builder reads: the index and the configuration.
#[derive(Clone, Copy, Debug)]
pub struct StubIrContext<'a> {
    pub index: &'a NativeIndex,
    pub config: &'a InteropConfig,
}

impl<'a> StubIrContext<'a> {
    pub fn new(index: &'a NativeIndex, config: &'a InteropConfig) -> Self {
        StubIrContext { index, config }
    }

    pub fn language(&self) -> Language {
        self.index.language
    }

    pub fn package(&self) -> &'a str {
        &self.config.package
    }
}
