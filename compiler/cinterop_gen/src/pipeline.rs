//! One generation run: build the Stub IR, then glue and bindings from it.
//!
//! Everything is rendered in memory. Nothing here touches the filesystem,
//! so a failure at any stage leaves no partial output behind.

use cinterop_klib::PackageDescriptor;

use crate::bridge::{emit_c_file, BridgeBuilder, BridgeError, NativeBridges, NativeLibrary};
use crate::builder::{BuildError, StubIrBuilder, StubIrBuilderResult};
use crate::context::{GenerationMode, StubIrContext};
use crate::emit::{EmitError, MetadataEmitter, TextEmitter};

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Generated bindings in the form chosen by [`GenerationMode`].
#[derive(Debug)]
pub enum Bindings {
    Source(String),
    Metadata(PackageDescriptor),
}

#[derive(Debug)]
pub struct GenerationOutput {
    pub stubs: StubIrBuilderResult,
    pub bridges: NativeBridges,
    /// Complete C glue file.
    pub glue: String,
    pub bindings: Bindings,
}

impl GenerationOutput {
    /// Forward declarations this library promises to resolve: the ones
    /// its bindings reference plus any requested in the configuration.
    pub fn exported_forward_declarations(&self, extra: &[String]) -> Vec<String> {
        let mut names = self.stubs.forward_declaration_names();
        names.extend(extra.iter().cloned());
        names.sort();
        names.dedup();
        names
    }
}

/// Run the generation stages in order.
///
/// The glue is rendered before the bindings, so a glue error wins over an
/// emitter error for the same declaration.
#[tracing::instrument(level = "debug", skip_all, fields(package = ctx.package()))]
pub fn generate(
    ctx: StubIrContext<'_>,
    mode: GenerationMode,
    library: &NativeLibrary,
    entry_point: Option<&str>,
) -> Result<GenerationOutput, GenError> {
    let stubs = StubIrBuilder::new(ctx).build()?;
    if !stubs.diagnostics.is_empty() {
        tracing::info!(
            skipped = stubs.diagnostics.len(),
            "some declarations have no binding"
        );
    }

    let bridges = BridgeBuilder::new(&ctx, &stubs).build()?.bridges;
    let glue = emit_c_file(library, &bridges, entry_point);

    let bindings = match mode {
        GenerationMode::Textual => Bindings::Source(TextEmitter::emit(&stubs.root)?),
        GenerationMode::Metadata => Bindings::Metadata(MetadataEmitter::emit(&stubs.root)?),
    };

    tracing::info!(
        bridges = bridges.len(),
        forward_declarations = stubs.forward_declarations.len(),
        ?mode,
        "generated bindings"
    );
    Ok(GenerationOutput {
        stubs,
        bridges,
        glue,
        bindings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{InteropConfig, UnsupportedPolicy};
    use cinterop_ir::{
        CType, FunctionDecl, Language, NativeIndex, Parameter, RecordKind, StructDecl, StructId,
    };
    use pretty_assertions::assert_eq;

    fn index() -> NativeIndex {
        let int = CType::int(4, true, "int");
        let mut index = NativeIndex::default();
        index.structs.push(StructDecl {
            spelling: "Handle".to_owned(),
            kind: RecordKind::Struct,
            is_anonymous: false,
            def: None,
        });
        index.functions.push(FunctionDecl {
            name: "add".to_owned(),
            return_type: int.clone(),
            parameters: ["a", "b"]
                .into_iter()
                .map(|name| Parameter {
                    name: Some(name.to_owned()),
                    ty: int.clone(),
                    ns_consumed: false,
                })
                .collect(),
            is_variadic: false,
        });
        index.functions.push(FunctionDecl {
            name: "release".to_owned(),
            return_type: CType::Void,
            parameters: vec![Parameter {
                name: Some("h".to_owned()),
                ty: CType::pointer(CType::Record(StructId::new(0))),
                ns_consumed: false,
            }],
            is_variadic: false,
        });
        index
    }

    #[test]
    fn textual_run_produces_source_and_glue() {
        let index = index();
        let config = InteropConfig::new("native");
        let library = NativeLibrary::new(Language::C);
        let out = generate(
            StubIrContext::new(&index, &config),
            GenerationMode::Textual,
            &library,
            Some("main"),
        )
        .unwrap();

        let Bindings::Source(text) = &out.bindings else {
            panic!("expected source bindings");
        };
        assert!(text.starts_with("package native\n"));
        assert!(text.contains("external fun add(a: lang.Int, b: lang.Int): lang.Int"));

        assert_eq!(out.bridges.len(), 2);
        for bridge in &out.bridges {
            assert!(out.glue.contains(&bridge.source));
        }
        assert!(out.glue.ends_with("return Konan_main(argc, argv);\n}\n"));
    }

    #[test]
    fn metadata_run_produces_package() {
        let index = index();
        let config = InteropConfig::new("native");
        let out = generate(
            StubIrContext::new(&index, &config),
            GenerationMode::Metadata,
            &NativeLibrary::new(Language::C),
            None,
        )
        .unwrap();

        let Bindings::Metadata(package) = &out.bindings else {
            panic!("expected metadata bindings");
        };
        let names: Vec<&str> = package.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["add", "release"]);
    }

    #[test]
    fn exported_forward_declarations_merge_config() {
        let index = index();
        let config = InteropConfig::new("native");
        let out = generate(
            StubIrContext::new(&index, &config),
            GenerationMode::Metadata,
            &NativeLibrary::new(Language::C),
            None,
        )
        .unwrap();

        let exported = out.exported_forward_declarations(&[
            "cnames.structs.Extra".to_owned(),
            "cnames.structs.Handle".to_owned(),
        ]);
        assert_eq!(
            exported,
            vec!["cnames.structs.Extra", "cnames.structs.Handle"]
        );
    }

    #[test]
    fn unsupported_declaration_aborts_the_run() {
        let mut index = index();
        index.functions.push(FunctionDecl {
            name: "weird".to_owned(),
            return_type: CType::Unsupported("__int256".to_owned()),
            parameters: Vec::new(),
            is_variadic: false,
        });
        let mut config = InteropConfig::new("native");
        config.policy = UnsupportedPolicy::Abort;

        let err = generate(
            StubIrContext::new(&index, &config),
            GenerationMode::Textual,
            &NativeLibrary::new(Language::C),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GenError::Build(BuildError::UnsupportedDeclaration { .. })
        ));
    }
}
