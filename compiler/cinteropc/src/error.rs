//! Driver errors.

use std::io;
use std::path::PathBuf;

use cinterop_gen::GenError;
use cinterop_klib::KlibError;
use cinterop_link::LinkError;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read native index '{path}': {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("toolchain `{command}` not found: {source}")]
    ToolchainNotFound {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The native toolchain rejected the glue. `stderr` is its output,
    /// unmodified.
    #[error("glue compilation failed:\n{stderr}")]
    GlueLink { stderr: String },

    #[error(transparent)]
    Gen(#[from] GenError),

    #[error(transparent)]
    Library(#[from] KlibError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl DriverError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DriverError::Io {
            path: path.into(),
            source,
        }
    }
}
