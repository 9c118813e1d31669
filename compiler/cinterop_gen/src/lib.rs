//! Cinterop Gen - from a native index to bindings, glue and metadata.
//!
//! # Pipeline
//!
//! ```text
//! NativeIndex + InteropConfig
//!        │
//!        ▼
//!  StubIrBuilder ──▶ StubIrBuilderResult (root container, tables, bridge requests)
//!        │
//!        ├──▶ BridgeBuilder ──▶ NativeBridges ──▶ emit_c_file ──▶ C glue
//!        ├──▶ TextEmitter ───────────────────────────────────▶ host source
//!        └──▶ MetadataEmitter ──▶ PackageDescriptor ──────────▶ container
//! ```
//!
//! Every stage is a pure function of its inputs. The mangler in particular
//! never looks at addresses, hash-map order or the clock, so two runs over
//! the same index produce byte-identical output.

pub mod bridge;
pub mod builder;
mod context;
mod cspell;
pub mod emit;
pub mod mangle;
mod pipeline;
mod writer;

pub use bridge::{
    emit_c_file, BridgeBuilder, BridgeBuilderResult, BridgeError, NativeBridge, NativeBridges,
    NativeLibrary,
};
pub use builder::{
    BindingTables, BridgeRequest, BridgeTarget, BuildError, BuilderDiagnostic, StubIrBuilder,
    StubIrBuilderResult,
};
pub use context::{GenerationMode, InteropConfig, StubIrContext, UnsupportedPolicy};
pub use emit::{EmitError, MetadataEmitter, TextEmitter};
pub use mangle::{
    bridge_symbol, forward_declaration_id, hash_mangle, InteropMangler, MangleTarget,
};
pub use pipeline::{generate, Bindings, GenError, GenerationOutput};
pub use writer::SourceWriter;
