//! Native declaration index.
//!
//! The index is produced by an external header indexer and handed over as
//! JSON. It is flat: every declaration kind is an ordered vector, and
//! declarations reference each other through typed indices.
//!
//! # Example
//!
//! ```text
//! struct Point { int x; int y; };        structs[0]   StructId(0)
//! typedef struct Point Point_t;          typedefs[0]  aliased: Record(StructId(0))
//! Point_t origin(void);                  functions[0] return: Typedef(TypedefId(0))
//! ```
//!
//! Call [`NativeIndex::validate`] before walking an index; afterwards every
//! typed index is known to be in bounds.

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Defines a typed index into one of the index vectors.
macro_rules! define_index {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => { $(
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                $name(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    )* };
}

define_index!(
    /// Index into [`NativeIndex::structs`].
    StructId,
    /// Index into [`NativeIndex::enums`].
    EnumId,
    /// Index into [`NativeIndex::typedefs`].
    TypedefId,
    /// Index into [`NativeIndex::objc_classes`].
    ObjCClassId,
    /// Index into [`NativeIndex::objc_protocols`].
    ObjCProtocolId,
);

// ── Types ──────────────────────────────────────────────────────────

/// A foreign type as seen by the indexer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CType {
    Void,
    Bool,
    /// Integer of `size` bytes. `spelling` is the C spelling (`int`, `unsigned long`).
    Int {
        size: u8,
        signed: bool,
        spelling: String,
    },
    Float {
        size: u8,
        spelling: String,
    },
    Pointer(Box<CType>),
    Const(Box<CType>),
    ConstArray {
        element: Box<CType>,
        length: u64,
    },
    IncompleteArray(Box<CType>),
    Record(StructId),
    Enum(EnumId),
    Typedef(TypedefId),
    FunctionPointer(Box<FunctionType>),
    ObjCObjectPointer(ObjCClassId),
    ObjCId {
        #[serde(default)]
        protocols: Vec<ObjCProtocolId>,
    },
    /// A construct the indexer could not describe; carries its spelling.
    Unsupported(String),
}

impl CType {
    pub fn int(size: u8, signed: bool, spelling: &str) -> Self {
        CType::Int {
            size,
            signed,
            spelling: spelling.to_owned(),
        }
    }

    pub fn pointer(pointee: CType) -> Self {
        CType::Pointer(Box::new(pointee))
    }

    pub fn constant(ty: CType) -> Self {
        CType::Const(Box::new(ty))
    }

    /// The type with any top-level `const` qualifiers removed.
    pub fn unqualified(&self) -> &CType {
        let mut ty = self;
        while let CType::Const(inner) = ty {
            ty = inner;
        }
        ty
    }

    /// `const char*` (or `char*`): marshaled as a host string.
    pub fn is_c_string(&self) -> bool {
        match self.unqualified() {
            CType::Pointer(pointee) => matches!(
                pointee.unqualified(),
                CType::Int { size: 1, spelling, .. } if spelling == "char"
            ),
            _ => false,
        }
    }

    /// `const wchar_t*`-style 16-bit string pointer.
    pub fn is_wide_string(&self) -> bool {
        match self.unqualified() {
            CType::Pointer(pointee) => matches!(
                pointee.unqualified(),
                CType::Int { size: 2, spelling, .. } if spelling == "unichar" || spelling == "char16_t"
            ),
            _ => false,
        }
    }
}

/// Signature of a function pointer type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub return_type: CType,
    #[serde(default)]
    pub parameters: Vec<CType>,
    #[serde(default)]
    pub variadic: bool,
}

// ── Declarations ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    C,
    #[serde(rename = "objc")]
    ObjC,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[default]
    Struct,
    Union,
}

impl RecordKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::Union => "union",
        }
    }
}

/// A struct or union. `def` is `None` for a forward declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub spelling: String,
    #[serde(default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub def: Option<StructDef>,
}

impl StructDecl {
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.def.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub size: u64,
    pub align: u64,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A struct member. `offset` is in bits; `bit_width` is set for bit fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: CType,
    pub offset: u64,
    #[serde(default)]
    pub bit_width: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub spelling: String,
    pub base_type: CType,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub constants: Vec<EnumConstant>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: String,
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypedefDef {
    pub name: String,
    pub aliased: CType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: Option<String>,
    pub ty: CType,
    #[serde(default)]
    pub ns_consumed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: CType,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub is_variadic: bool,
}

/// A global variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalDecl {
    pub name: String,
    pub ty: CType,
    #[serde(default)]
    pub is_const: bool,
}

/// A `#define` whose value the indexer could evaluate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantDef {
    pub name: String,
    pub value: ConstantValue,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantValue {
    Integer { value: i64, ty: CType },
    FloatingPoint { value: f64, ty: CType },
    String(String),
}

/// A `#define` expression that must be evaluated by native code at runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WrappedMacroDef {
    pub name: String,
    pub ty: CType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjCMethod {
    pub selector: String,
    pub encoding: String,
    pub return_type: CType,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub is_class: bool,
    #[serde(default)]
    pub is_variadic: bool,
    #[serde(default)]
    pub ns_returns_retained: bool,
    #[serde(default)]
    pub ns_consumes_self: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjCClass {
    pub name: String,
    #[serde(default)]
    pub is_forward: bool,
    #[serde(default)]
    pub base_class: Option<ObjCClassId>,
    #[serde(default)]
    pub protocols: Vec<ObjCProtocolId>,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub methods: Vec<ObjCMethod>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjCProtocol {
    pub name: String,
    #[serde(default)]
    pub is_forward: bool,
    #[serde(default)]
    pub protocols: Vec<ObjCProtocolId>,
    #[serde(default)]
    pub methods: Vec<ObjCMethod>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjCCategory {
    pub name: String,
    pub class: ObjCClassId,
    #[serde(default)]
    pub methods: Vec<ObjCMethod>,
}

// ── Index ──────────────────────────────────────────────────────────

/// Everything the indexer found in one set of headers, in source order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeIndex {
    pub language: Language,
    pub structs: Vec<StructDecl>,
    pub enums: Vec<EnumDef>,
    pub typedefs: Vec<TypedefDef>,
    pub functions: Vec<FunctionDecl>,
    pub globals: Vec<GlobalDecl>,
    pub constants: Vec<ConstantDef>,
    pub wrapped_macros: Vec<WrappedMacroDef>,
    pub objc_classes: Vec<ObjCClass>,
    pub objc_protocols: Vec<ObjCProtocol>,
    pub objc_categories: Vec<ObjCCategory>,
}

impl NativeIndex {
    #[inline]
    pub fn struct_decl(&self, id: StructId) -> &StructDecl {
        &self.structs[id.index()]
    }

    #[inline]
    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enums[id.index()]
    }

    #[inline]
    pub fn typedef(&self, id: TypedefId) -> &TypedefDef {
        &self.typedefs[id.index()]
    }

    #[inline]
    pub fn objc_class(&self, id: ObjCClassId) -> &ObjCClass {
        &self.objc_classes[id.index()]
    }

    #[inline]
    pub fn objc_protocol(&self, id: ObjCProtocolId) -> &ObjCProtocol {
        &self.objc_protocols[id.index()]
    }

    pub fn struct_ids(&self) -> impl Iterator<Item = StructId> {
        (0..self.structs.len()).map(|i| StructId::new(index_u32(i)))
    }

    pub fn enum_ids(&self) -> impl Iterator<Item = EnumId> {
        (0..self.enums.len()).map(|i| EnumId::new(index_u32(i)))
    }

    pub fn typedef_ids(&self) -> impl Iterator<Item = TypedefId> {
        (0..self.typedefs.len()).map(|i| TypedefId::new(index_u32(i)))
    }

    pub fn objc_class_ids(&self) -> impl Iterator<Item = ObjCClassId> {
        (0..self.objc_classes.len()).map(|i| ObjCClassId::new(index_u32(i)))
    }

    pub fn objc_protocol_ids(&self) -> impl Iterator<Item = ObjCProtocolId> {
        (0..self.objc_protocols.len()).map(|i| ObjCProtocolId::new(index_u32(i)))
    }

    /// Spellings of every typedef, used by the struct naming policy.
    pub fn typedef_names(&self) -> FxHashSet<&str> {
        self.typedefs.iter().map(|t| t.name.as_str()).collect()
    }

    /// Check that every typed index refers to an existing declaration.
    pub fn validate(&self) -> Result<(), IndexError> {
        let v = Validator { index: self };
        for s in &self.structs {
            for field in s.def.iter().flat_map(|d| &d.fields) {
                v.check(&field.ty, &s.spelling)?;
            }
        }
        for e in &self.enums {
            v.check(&e.base_type, &e.spelling)?;
        }
        for t in &self.typedefs {
            v.check(&t.aliased, &t.name)?;
        }
        for f in &self.functions {
            v.check(&f.return_type, &f.name)?;
            for p in &f.parameters {
                v.check(&p.ty, &f.name)?;
            }
        }
        for g in &self.globals {
            v.check(&g.ty, &g.name)?;
        }
        for c in &self.constants {
            if let ConstantValue::Integer { ty, .. } | ConstantValue::FloatingPoint { ty, .. } =
                &c.value
            {
                v.check(ty, &c.name)?;
            }
        }
        for m in &self.wrapped_macros {
            v.check(&m.ty, &m.name)?;
        }
        for c in &self.objc_classes {
            if let Some(base) = c.base_class {
                v.class(base, &c.name)?;
            }
            for &p in &c.protocols {
                v.protocol(p, &c.name)?;
            }
            v.methods(&c.methods, &c.name)?;
        }
        for p in &self.objc_protocols {
            for &q in &p.protocols {
                v.protocol(q, &p.name)?;
            }
            v.methods(&p.methods, &p.name)?;
        }
        for c in &self.objc_categories {
            v.class(c.class, &c.name)?;
            v.methods(&c.methods, &c.name)?;
        }
        Ok(())
    }
}

#[inline]
fn index_u32(i: usize) -> u32 {
    u32::try_from(i).unwrap_or(u32::MAX)
}

/// A malformed index handed over by the indexer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("`{context}` references {kind} #{index}, but the index has only {len}")]
    DanglingReference {
        kind: &'static str,
        index: u32,
        len: usize,
        context: String,
    },
}

struct Validator<'a> {
    index: &'a NativeIndex,
}

impl Validator<'_> {
    fn bounds(kind: &'static str, raw: u32, len: usize, context: &str) -> Result<(), IndexError> {
        if (raw as usize) < len {
            Ok(())
        } else {
            Err(IndexError::DanglingReference {
                kind,
                index: raw,
                len,
                context: context.to_owned(),
            })
        }
    }

    fn class(&self, id: ObjCClassId, context: &str) -> Result<(), IndexError> {
        Self::bounds("class", id.raw(), self.index.objc_classes.len(), context)
    }

    fn protocol(&self, id: ObjCProtocolId, context: &str) -> Result<(), IndexError> {
        Self::bounds("protocol", id.raw(), self.index.objc_protocols.len(), context)
    }

    fn methods(&self, methods: &[ObjCMethod], context: &str) -> Result<(), IndexError> {
        for m in methods {
            self.check(&m.return_type, context)?;
            for p in &m.parameters {
                self.check(&p.ty, context)?;
            }
        }
        Ok(())
    }

    fn check(&self, ty: &CType, context: &str) -> Result<(), IndexError> {
        match ty {
            CType::Void
            | CType::Bool
            | CType::Int { .. }
            | CType::Float { .. }
            | CType::Unsupported(_) => Ok(()),
            CType::Pointer(inner) | CType::Const(inner) | CType::IncompleteArray(inner) => {
                self.check(inner, context)
            }
            CType::ConstArray { element, .. } => self.check(element, context),
            CType::Record(id) => {
                Self::bounds("struct", id.raw(), self.index.structs.len(), context)
            }
            CType::Enum(id) => Self::bounds("enum", id.raw(), self.index.enums.len(), context),
            CType::Typedef(id) => {
                Self::bounds("typedef", id.raw(), self.index.typedefs.len(), context)
            }
            CType::FunctionPointer(f) => {
                self.check(&f.return_type, context)?;
                for p in &f.parameters {
                    self.check(p, context)?;
                }
                Ok(())
            }
            CType::ObjCObjectPointer(id) => self.class(*id, context),
            CType::ObjCId { protocols } => {
                for &p in protocols {
                    self.protocol(p, context)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::C => f.write_str("C"),
            Language::ObjC => f.write_str("Objective-C"),
        }
    }
}
