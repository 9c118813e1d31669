//! Cinterop IR - Native index and Stub IR for the binding generator.
//!
//! This crate holds the data shared by every stage of the interop pipeline:
//!
//! ```text
//! NativeIndex ──builder──▶ Stub IR ──┬──▶ text emitter
//!  (index)                  (stub)   ├──▶ metadata emitter ──▶ container
//!                                    └──▶ bridge builder ───▶ C glue
//! ```
//!
//! # Design
//!
//! - **Flat index**: foreign declarations live in ordered vectors; cross
//!   references are typed indices (`StructId`, `TypedefId`, ...), never
//!   pointers.
//! - **Immutable stubs**: a `Stub` tree is built once and only read
//!   afterwards. Emitters borrow it.
//! - **Closed variant set**: `Stub::accept` matches exhaustively, so a new
//!   variant breaks every `StubIrVisitor` until it is handled.
//! - **Explicit tables**: interning state (anonymous struct names,
//!   type-parameter ids) is an owned value, never a global.

pub mod annotation;
pub mod flags;
pub mod index;
pub mod interner;
pub mod names;
pub mod stub;
pub mod types;
pub mod uniq_id;
pub mod visitor;

pub use annotation::{AnnotationStub, AnnotationValue};
pub use flags::StubFlags;
pub use index::{
    CType, ConstantDef, ConstantValue, EnumConstant, EnumDef, EnumId, Field, FunctionDecl,
    FunctionType, GlobalDecl, IndexError, Language, NativeIndex, ObjCCategory, ObjCClass,
    ObjCClassId, ObjCMethod, ObjCProtocol, ObjCProtocolId, Parameter, RecordKind, StructDecl,
    StructDef, StructId, TypedefDef, TypedefId, WrappedMacroDef,
};
pub use interner::{AnonymousStructNames, TypeParameterInterner};
pub use names::{is_forward_declaration_package, ForwardKind};
pub use stub::{
    AccessorKind, ClassKind, ClassStub, ConstantStub, ConstructorStub, FunctionParameterStub,
    FunctionStub, PropertyAccessor, PropertyKind, PropertyStub, Stub, StubContainer,
    TypeAliasStub,
};
pub use types::{
    Classifier, StubType, TypeArgument, TypeParamKey, TypeParameterStub, Variance,
    BUILTINS_PACKAGE, RUNTIME_PACKAGE,
};
pub use uniq_id::UniqId;
pub use visitor::{StubIrVisitor, UnsupportedStub};
