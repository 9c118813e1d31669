//! Container errors.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum KlibError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{path}' is not a cinterop library")]
    BadMagic { path: PathBuf },

    #[error("'{path}' has container version {found}, expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("'{path}' is corrupt: checksum {found:08x}, expected {expected:08x}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("'{path}' is truncated")]
    Truncated { path: PathBuf },

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error("{table} index {index} out of range in fragment '{fragment}'")]
    BadIndex {
        fragment: String,
        table: &'static str,
        index: u32,
    },

    #[error("library has no fragment #{0}")]
    NoSuchFragment(usize),
}

impl KlibError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        KlibError::Io {
            path: path.into(),
            source,
        }
    }
}
