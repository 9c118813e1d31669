//! Cinterop Klib - metadata container for interop libraries.
//!
//! A library is one file:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ header (32 bytes)            │  magic, version, CRC32, section lengths
//! ├──────────────────────────────┤
//! │ library descriptor (bincode) │  module name, fragment names, manifest
//! ├──────────────────────────────┤
//! │ fragment 0 (len + bincode)   │  strings, types, package, bodies
//! │ fragment 1 ...               │
//! ├──────────────────────────────┤
//! │ native section (optional)    │  glue object code, native link libraries
//! └──────────────────────────────┘
//! ```
//!
//! String, type and body indices are local to their fragment. Anything that
//! crosses a fragment or library boundary is referenced by [`UniqId`].
//!
//! [`UniqId`]: cinterop_ir::UniqId

mod container;
mod descriptor;
mod error;
mod manifest;
mod proto;
mod table;

pub use container::{
    read_descriptor, read_manifest, write_atomically, Library, LibraryDescriptor, LibraryWriter,
    NativeSection, StagedFile, ABI_VERSION, FORMAT_VERSION, HEADER_SIZE, MAGIC,
};
pub use descriptor::{
    AccessorDescriptor, AnnotationArgument, AnnotationDescriptor, ClassDescriptor,
    ClassDescriptorKind, ConstantValue, ConstructorDescriptor, DeclFlags, FunctionDescriptor,
    PackageDescriptor, ProjectionVariance, PropertyDescriptor, TypeAliasDescriptor,
    TypeArgumentDescriptor, TypeDescriptor, TypeKind, TypeParameterDescriptor,
    ValueParameterDescriptor,
};
pub use error::KlibError;
pub use manifest::Manifest;
pub use proto::{
    encode_package, BodyId, DeclKind, FragmentDecoder, PackageFragment, ProtoPackage, ProtoType,
    ProtoTypeKind, SymbolEntry, SymbolId,
};
pub use table::{StringId, StringTable, TypeId, TypeTable};
