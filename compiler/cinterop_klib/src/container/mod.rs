//! Container file: header, library descriptor, fragments, native section.
//!
//! # Header (32 bytes, little endian)
//!
//! | bytes  | field            |
//! |--------|------------------|
//! | 0..4   | magic `CIKL`     |
//! | 4..8   | format version   |
//! | 8..12  | CRC32 of bytes 32.. |
//! | 12..16 | descriptor length |
//! | 16..24 | fragment section length |
//! | 24..32 | native section length |
//!
//! The fragment section is a sequence of `u64` length-prefixed bincode
//! blobs, one per entry of `LibraryDescriptor::fragment_names`, in order.
//!
//! # Atomic commit
//!
//! The whole file is rendered in memory, written to a temp file in the
//! destination directory, and renamed over the destination. If any step
//! fails, the temp file is dropped and deleted; the destination is never
//! left half written.

use std::cell::OnceCell;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::KlibError;
use crate::manifest::Manifest;
use crate::proto::PackageFragment;

pub const MAGIC: [u8; 4] = *b"CIKL";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 32;

/// Metadata ABI version; bumped when descriptor semantics change.
pub const ABI_VERSION: u32 = 1;

const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Header ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Header {
    magic: [u8; 4],
    version: u32,
    checksum: u32,
    descriptor_len: u32,
    fragments_len: u64,
    native_len: u64,
}

impl Header {
    fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let u64_at = |at: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(b)
        };
        Header {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: u32_at(4),
            checksum: u32_at(8),
            descriptor_len: u32_at(12),
            fragments_len: u64_at(16),
            native_len: u64_at(24),
        }
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.descriptor_len.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.fragments_len.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.native_len.to_le_bytes());
        bytes
    }

    fn validate(&self, path: &Path) -> Result<(), KlibError> {
        if self.magic != MAGIC {
            return Err(KlibError::BadMagic {
                path: path.to_path_buf(),
            });
        }
        if self.version != FORMAT_VERSION {
            return Err(KlibError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: self.version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(())
    }
}

// ── Descriptors ────────────────────────────────────────────────────

/// Library-level metadata, decoded eagerly on open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDescriptor {
    pub module_name: String,
    pub fragment_names: Vec<String>,
    pub manifest: Manifest,
    pub abi_version: u32,
    pub compiler_version: String,
}

/// Compiled glue and the native libraries it links against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSection {
    pub object: Vec<u8>,
    pub link_libraries: Vec<String>,
}

impl NativeSection {
    fn is_empty(&self) -> bool {
        self.object.is_empty() && self.link_libraries.is_empty()
    }
}

// ── Writer ─────────────────────────────────────────────────────────

/// Assembles a library and commits it to disk in one step.
#[derive(Debug)]
pub struct LibraryWriter {
    module_name: String,
    fragments: Vec<PackageFragment>,
    manifest: Manifest,
    link_dependencies: Vec<String>,
    native: NativeSection,
}

impl LibraryWriter {
    pub fn new(module_name: impl Into<String>) -> Self {
        LibraryWriter {
            module_name: module_name.into(),
            fragments: Vec::new(),
            manifest: Manifest::new(),
            link_dependencies: Vec::new(),
            native: NativeSection::default(),
        }
    }

    #[must_use]
    pub fn add_fragment(mut self, fragment: PackageFragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Merge manifest properties; later additions overwrite earlier ones.
    #[must_use]
    pub fn add_manifest(mut self, manifest: &Manifest) -> Self {
        self.manifest.merge(manifest);
        self
    }

    #[must_use]
    pub fn add_native_object(mut self, object: Vec<u8>) -> Self {
        self.native.object = object;
        self
    }

    #[must_use]
    pub fn add_native_library(mut self, name: impl Into<String>) -> Self {
        self.native.link_libraries.push(name.into());
        self
    }

    /// Record a library this one depends on (manifest `depends`).
    #[must_use]
    pub fn add_link_dependency(mut self, name: impl Into<String>) -> Self {
        self.link_dependencies.push(name.into());
        self
    }

    fn descriptor(&self) -> LibraryDescriptor {
        let mut manifest = self.manifest.clone();
        if manifest.unique_name().is_none() {
            manifest.set(Manifest::UNIQUE_NAME, self.module_name.clone());
        }
        let mut depends: Vec<String> = manifest.depends().into_iter().map(str::to_owned).collect();
        for dep in &self.link_dependencies {
            if !depends.contains(dep) {
                depends.push(dep.clone());
            }
        }
        if !depends.is_empty() {
            manifest.set_list(Manifest::DEPENDS, &depends);
        }
        manifest.set(Manifest::ABI_VERSION, ABI_VERSION.to_string());
        manifest.set(Manifest::COMPILER_VERSION, COMPILER_VERSION);

        LibraryDescriptor {
            module_name: self.module_name.clone(),
            fragment_names: self.fragments.iter().map(|f| f.fq_name.clone()).collect(),
            manifest,
            abi_version: ABI_VERSION,
            compiler_version: COMPILER_VERSION.to_owned(),
        }
    }

    /// Render the complete container.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KlibError> {
        let descriptor = bincode::serialize(&self.descriptor()).map_err(|source| {
            KlibError::Encode {
                what: "library descriptor",
                source,
            }
        })?;

        let mut fragments = Vec::new();
        for fragment in &self.fragments {
            let blob = fragment.to_bytes()?;
            fragments.extend_from_slice(&(blob.len() as u64).to_le_bytes());
            fragments.extend_from_slice(&blob);
        }

        let native = if self.native.is_empty() {
            Vec::new()
        } else {
            bincode::serialize(&self.native).map_err(|source| KlibError::Encode {
                what: "native section",
                source,
            })?
        };

        let mut body = Vec::with_capacity(descriptor.len() + fragments.len() + native.len());
        body.extend_from_slice(&descriptor);
        body.extend_from_slice(&fragments);
        body.extend_from_slice(&native);

        let header = Header {
            magic: MAGIC,
            version: FORMAT_VERSION,
            checksum: crc32fast::hash(&body),
            descriptor_len: u32::try_from(descriptor.len()).unwrap_or(u32::MAX),
            fragments_len: fragments.len() as u64,
            native_len: native.len() as u64,
        };

        let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Write the container to `path` atomically.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %self.module_name))]
    pub fn commit(self, path: &Path) -> Result<LibraryDescriptor, KlibError> {
        let bytes = self.to_bytes()?;
        write_atomically(path, &bytes)?;
        tracing::debug!(
            path = %path.display(),
            bytes = bytes.len(),
            fragments = self.fragments.len(),
            "committed library"
        );
        Ok(self.descriptor())
    }
}

/// A file written and synced next to its destination, not yet renamed
/// into place. Dropping it deletes the temp file.
///
/// Staging every output before persisting any lets a caller fail without
/// committing a partial set of artifacts.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    pub fn stage(path: &Path, bytes: &[u8]) -> Result<Self, KlibError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| KlibError::io(&parent, e))?;

        let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| KlibError::io(&parent, e))?;
        tmp.write_all(bytes).map_err(|e| KlibError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| KlibError::io(tmp.path(), e))?;
        Ok(StagedFile {
            tmp,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the staged file over its destination.
    pub fn persist(self) -> Result<(), KlibError> {
        let StagedFile { tmp, path } = self;
        tmp.persist(&path)
            .map_err(|e| KlibError::io(&path, e.error))?;
        Ok(())
    }
}

/// Write `bytes` to a temp file next to `path`, then rename it into place.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), KlibError> {
    StagedFile::stage(path, bytes)?.persist()
}

// ── Reader ─────────────────────────────────────────────────────────

/// An opened library. Fragments are decoded on first access.
#[derive(Debug)]
pub struct Library {
    path: PathBuf,
    descriptor: LibraryDescriptor,
    bytes: Vec<u8>,
    fragment_ranges: Vec<Range<usize>>,
    native_range: Range<usize>,
    fragments: Vec<OnceCell<PackageFragment>>,
}

impl Library {
    pub fn open(path: &Path) -> Result<Self, KlibError> {
        let bytes = fs::read(path).map_err(|e| KlibError::io(path, e))?;
        Self::from_bytes(path, bytes)
    }

    /// Parse a container already in memory. `path` is used for diagnostics.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self, KlibError> {
        let truncated = || KlibError::Truncated {
            path: path.to_path_buf(),
        };
        let head: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(truncated)?;
        let header = Header::from_bytes(head);
        header.validate(path)?;

        let descriptor_end = HEADER_SIZE + header.descriptor_len as usize;
        let fragments_end = descriptor_end
            .checked_add(usize::try_from(header.fragments_len).map_err(|_| truncated())?)
            .ok_or_else(truncated)?;
        let native_end = fragments_end
            .checked_add(usize::try_from(header.native_len).map_err(|_| truncated())?)
            .ok_or_else(truncated)?;
        if native_end != bytes.len() {
            return Err(truncated());
        }

        let found = crc32fast::hash(&bytes[HEADER_SIZE..]);
        if found != header.checksum {
            return Err(KlibError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: header.checksum,
                found,
            });
        }

        let descriptor: LibraryDescriptor =
            bincode::deserialize(&bytes[HEADER_SIZE..descriptor_end]).map_err(|source| {
                KlibError::Decode {
                    what: "library descriptor",
                    source,
                }
            })?;

        let mut fragment_ranges = Vec::with_capacity(descriptor.fragment_names.len());
        let mut pos = descriptor_end;
        while pos < fragments_end {
            let len_bytes: [u8; 8] = bytes
                .get(pos..pos + 8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(truncated)?;
            let len = usize::try_from(u64::from_le_bytes(len_bytes)).map_err(|_| truncated())?;
            let start = pos + 8;
            let end = start.checked_add(len).ok_or_else(truncated)?;
            if end > fragments_end {
                return Err(truncated());
            }
            fragment_ranges.push(start..end);
            pos = end;
        }
        if fragment_ranges.len() != descriptor.fragment_names.len() {
            return Err(truncated());
        }

        tracing::debug!(
            path = %path.display(),
            module = %descriptor.module_name,
            fragments = fragment_ranges.len(),
            "opened library"
        );

        let fragments = fragment_ranges.iter().map(|_| OnceCell::new()).collect();
        Ok(Library {
            path: path.to_path_buf(),
            descriptor,
            bytes,
            fragment_ranges,
            native_range: fragments_end..native_end,
            fragments,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn descriptor(&self) -> &LibraryDescriptor {
        &self.descriptor
    }

    pub fn module_name(&self) -> &str {
        &self.descriptor.module_name
    }

    pub fn manifest(&self) -> &Manifest {
        &self.descriptor.manifest
    }

    pub fn fragment_names(&self) -> &[String] {
        &self.descriptor.fragment_names
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_ranges.len()
    }

    /// Fragment `index`, decoded on first access.
    pub fn fragment(&self, index: usize) -> Result<&PackageFragment, KlibError> {
        let cell = self
            .fragments
            .get(index)
            .ok_or(KlibError::NoSuchFragment(index))?;
        if let Some(fragment) = cell.get() {
            return Ok(fragment);
        }
        let range = self.fragment_ranges[index].clone();
        let fragment = PackageFragment::from_bytes(&self.bytes[range])?;
        tracing::trace!(
            module = %self.descriptor.module_name,
            fragment = %fragment.fq_name,
            "decoded fragment"
        );
        Ok(cell.get_or_init(|| fragment))
    }

    pub fn native_section(&self) -> Result<Option<NativeSection>, KlibError> {
        if self.native_range.is_empty() {
            return Ok(None);
        }
        bincode::deserialize(&self.bytes[self.native_range.clone()])
            .map(Some)
            .map_err(|source| KlibError::Decode {
                what: "native section",
                source,
            })
    }
}

/// Read only the library descriptor: header plus descriptor bytes.
///
/// The body checksum is not verified; fragments are never touched.
pub fn read_descriptor(path: &Path) -> Result<LibraryDescriptor, KlibError> {
    let mut file = File::open(path).map_err(|e| KlibError::io(path, e))?;
    let read_err = |e: io::Error| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            KlibError::Truncated {
                path: path.to_path_buf(),
            }
        } else {
            KlibError::io(path, e)
        }
    };

    let mut head = [0u8; HEADER_SIZE];
    file.read_exact(&mut head).map_err(read_err)?;
    let header = Header::from_bytes(&head);
    header.validate(path)?;

    let mut descriptor = vec![0u8; header.descriptor_len as usize];
    file.read_exact(&mut descriptor).map_err(read_err)?;
    bincode::deserialize(&descriptor).map_err(|source| KlibError::Decode {
        what: "library descriptor",
        source,
    })
}

/// Read the manifest of the library at `path`.
pub fn read_manifest(path: &Path) -> Result<Manifest, KlibError> {
    read_descriptor(path).map(|d| d.manifest)
}

#[cfg(test)]
mod tests;
