//! Stub IR emitters.
//!
//! Both emitters are [`StubIrVisitor`](cinterop_ir::StubIrVisitor)s over the
//! same tree:
//!
//! | Emitter | Output |
//! |---------|--------|
//! | [`TextEmitter`] | host-language source, one file per package |
//! | [`MetadataEmitter`] | a [`PackageDescriptor`](cinterop_klib::PackageDescriptor) for the container |
//!
//! The C glue is not a visitor; it is rendered from bridge requests by
//! [`emit_c_file`](crate::bridge::emit_c_file).

mod metadata;
mod text;

pub use metadata::MetadataEmitter;
pub use text::TextEmitter;

use cinterop_ir::UnsupportedStub;

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error(transparent)]
    UnsupportedStub(#[from] UnsupportedStub),
}
