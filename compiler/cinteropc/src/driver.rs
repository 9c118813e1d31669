//! One driver run: index in, artifacts out.
//!
//! ```text
//! config.toml ─▶ index JSON ─▶ generate ─▶ glue ─▶ toolchain (optional)
//!                                  │                    │
//!                                  ▼                    ▼
//!                             bindings            object bytes
//!                                  └──────┬─────────────┘
//!                                         ▼
//!              stage glue, bindings and container beside their paths
//!                                         ▼
//!                        rename all three into place
//! ```
//!
//! Every artifact is rendered and staged before the first rename, so an
//! error in generation, glue compilation or any write leaves no output on
//! disk.

use std::fs;
use std::path::{Path, PathBuf};

use cinterop_gen::{generate, Bindings, StubIrContext};
use cinterop_ir::NativeIndex;
use cinterop_klib::{encode_package, LibraryWriter, Manifest, StagedFile};
use cinterop_link::{LinkSession, LinkedProgram};

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::toolchain::{CcToolchain, NativeToolchain};

/// What a run wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverOutput {
    pub library: PathBuf,
    pub glue: PathBuf,
    pub bindings: Option<PathBuf>,
    pub bridges: usize,
    /// Declarations dropped under the skip policy.
    pub skipped: usize,
    pub exported_forward_declarations: Vec<String>,
}

pub fn read_index(path: &Path) -> Result<NativeIndex, DriverError> {
    let text = fs::read_to_string(path).map_err(|e| DriverError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| DriverError::Index {
        path: path.to_path_buf(),
        source,
    })
}

/// Run with the toolchain named in the configuration, if any.
pub fn run_config(config: &DriverConfig) -> Result<DriverOutput, DriverError> {
    let toolchain = config.toolchain.as_ref().map(CcToolchain::from_config);
    run(config, toolchain.as_ref().map(|t| t as &dyn NativeToolchain))
}

#[tracing::instrument(level = "debug", skip_all, fields(module = %config.module_name))]
pub fn run(
    config: &DriverConfig,
    toolchain: Option<&dyn NativeToolchain>,
) -> Result<DriverOutput, DriverError> {
    let index = read_index(&config.index)?;
    let interop = config.interop_config();
    let library = config.native_library(index.language);
    let generated = generate(
        StubIrContext::new(&index, &interop),
        config.mode,
        &library,
        config.entry_point.as_deref(),
    )?;

    let exported = generated.exported_forward_declarations(&config.export_forward_declarations);
    let mut writer =
        LibraryWriter::new(config.module_name.as_str()).add_manifest(&manifest(config, &exported));
    for dependency in &config.depends {
        writer = writer.add_link_dependency(dependency.as_str());
    }
    for native in &config.link_libraries {
        writer = writer.add_native_library(native.as_str());
    }

    let source = match generated.bindings {
        Bindings::Metadata(package) => {
            writer = writer.add_fragment(encode_package(&package));
            None
        }
        Bindings::Source(text) => {
            let Some(path) = &config.output.bindings else {
                return Err(DriverError::Config(
                    "textual mode needs `output.bindings`".to_owned(),
                ));
            };
            Some((path, text))
        }
    };

    if let Some(toolchain) = toolchain {
        writer = writer.add_native_object(compile_glue(toolchain, &generated.glue)?);
    }

    let mut staged = vec![StagedFile::stage(&config.output.glue, generated.glue.as_bytes())?];
    if let Some((path, text)) = &source {
        staged.push(StagedFile::stage(path, text.as_bytes())?);
    }
    staged.push(StagedFile::stage(&config.output.library, &writer.to_bytes()?)?);
    for file in staged {
        tracing::debug!(path = %file.path().display(), "committing artifact");
        file.persist()?;
    }

    tracing::info!(
        library = %config.output.library.display(),
        bridges = generated.bridges.len(),
        "wrote interop library"
    );
    Ok(DriverOutput {
        library: config.output.library.clone(),
        glue: config.output.glue.clone(),
        bindings: source.map(|(path, _)| path.clone()),
        bridges: generated.bridges.len(),
        skipped: generated.stubs.diagnostics.len(),
        exported_forward_declarations: exported,
    })
}

fn manifest(config: &DriverConfig, exported: &[String]) -> Manifest {
    let mut manifest = Manifest::new();
    manifest.set(Manifest::INTEROP, "true");
    manifest.set(Manifest::PACKAGE, config.package.as_str());
    if config.noir {
        manifest.set(Manifest::NOIR, "true");
    }
    if !exported.is_empty() {
        manifest.set_list(Manifest::EXPORT_FORWARD_DECLARATIONS, exported);
    }
    manifest
}

/// Compile `glue` in a scratch directory and return the object bytes.
fn compile_glue(toolchain: &dyn NativeToolchain, glue: &str) -> Result<Vec<u8>, DriverError> {
    let scratch = tempfile::tempdir().map_err(|e| DriverError::io(std::env::temp_dir(), e))?;
    let source = scratch.path().join("glue.c");
    let object = scratch.path().join("glue.o");
    fs::write(&source, glue).map_err(|e| DriverError::io(&source, e))?;
    toolchain.compile(&source, &object)?;
    fs::read(&object).map_err(|e| DriverError::io(&object, e))
}

/// Link a set of interop libraries and resolve their forward declarations.
#[tracing::instrument(level = "debug", skip_all, fields(libraries = paths.len()))]
pub fn link(paths: &[PathBuf]) -> Result<LinkedProgram, DriverError> {
    let mut session = LinkSession::new();
    for path in paths {
        session.open_library(path)?;
    }
    Ok(session.finish()?)
}
