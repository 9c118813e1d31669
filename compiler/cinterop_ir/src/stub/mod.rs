//! Stub IR: the declaration tree produced from a native index.
//!
//! ```text
//! Container "sqlite"
//! ├── Class sqlite3_stmt (opaque)
//! ├── TypeAlias sqlite3_int64 = lang.Long
//! ├── Function sqlite3_open(filename: String?, ppDb: CPointer<...>?): Int
//! └── Property SQLITE_OK: Int = 0
//! ```
//!
//! Every node is built once by the builder and never mutated afterwards.
//! Containers and class members keep insertion order; generated sources and
//! containers depend on it for reproducibility.

use crate::annotation::AnnotationStub;
use crate::flags::StubFlags;
use crate::types::{Classifier, StubType, TypeParameterStub};

/// A node of the Stub IR tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Stub {
    Class(ClassStub),
    TypeAlias(TypeAliasStub),
    Function(FunctionStub),
    Property(PropertyStub),
    Constructor(ConstructorStub),
    PropertyAccessor(PropertyAccessor),
    Container(StubContainer),
}

impl Stub {
    /// Short name of the variant, for diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Stub::Class(_) => "class",
            Stub::TypeAlias(_) => "typealias",
            Stub::Function(_) => "function",
            Stub::Property(_) => "property",
            Stub::Constructor(_) => "constructor",
            Stub::PropertyAccessor(_) => "property accessor",
            Stub::Container(_) => "container",
        }
    }

    /// Qualified name of the node as it appears in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Stub::Class(c) => c.classifier.fq_name(),
            Stub::TypeAlias(t) => t.alias.fq_name(),
            Stub::Function(f) => f.name.clone(),
            Stub::Property(p) => p.name.clone(),
            Stub::Constructor(_) => "<init>".to_owned(),
            Stub::PropertyAccessor(a) => a.kind.name().to_owned(),
            Stub::Container(c) => c.name.clone(),
        }
    }

    pub fn annotations(&self) -> &[AnnotationStub] {
        match self {
            Stub::Class(c) => &c.annotations,
            Stub::TypeAlias(t) => &t.annotations,
            Stub::Function(f) => &f.annotations,
            Stub::Property(p) => &p.annotations,
            Stub::Constructor(c) => &c.annotations,
            Stub::PropertyAccessor(a) => &a.annotations,
            Stub::Container(_) => &[],
        }
    }

    pub fn flags(&self) -> StubFlags {
        match self {
            Stub::Class(c) => c.flags,
            Stub::TypeAlias(t) => t.flags,
            Stub::Function(f) => f.flags,
            Stub::Property(p) => p.flags,
            Stub::Constructor(c) => c.flags,
            Stub::PropertyAccessor(a) => a.flags,
            Stub::Container(_) => StubFlags::empty(),
        }
    }

    /// Depth-first walk over this node and its class members or children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Stub)) {
        f(self);
        match self {
            Stub::Class(c) => c.members.iter().for_each(|m| m.walk(f)),
            Stub::Container(c) => c.children.iter().for_each(|m| m.walk(f)),
            Stub::TypeAlias(_)
            | Stub::Function(_)
            | Stub::Property(_)
            | Stub::Constructor(_)
            | Stub::PropertyAccessor(_) => {}
        }
    }
}

// ── Classes ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Struct,
    Union,
    ObjCClass,
    ObjCProtocol,
    /// Forward-declared type with no known layout.
    Opaque,
}

impl ClassKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            ClassKind::Struct | ClassKind::Union | ClassKind::ObjCClass | ClassKind::Opaque => {
                "class"
            }
            ClassKind::ObjCProtocol => "interface",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassStub {
    pub classifier: Classifier,
    pub kind: ClassKind,
    pub flags: StubFlags,
    pub annotations: Vec<AnnotationStub>,
    pub supertypes: Vec<StubType>,
    pub type_parameters: Vec<TypeParameterStub>,
    pub members: Vec<Stub>,
    pub mangled_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAliasStub {
    pub alias: Classifier,
    pub aliasee: StubType,
    pub flags: StubFlags,
    pub annotations: Vec<AnnotationStub>,
    pub mangled_name: String,
}

// ── Functions ──────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionParameterStub {
    pub name: String,
    pub ty: StubType,
    pub is_vararg: bool,
    pub annotations: Vec<AnnotationStub>,
}

impl FunctionParameterStub {
    pub fn new(name: impl Into<String>, ty: StubType) -> Self {
        FunctionParameterStub {
            name: name.into(),
            ty,
            is_vararg: false,
            annotations: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionStub {
    pub name: String,
    pub return_type: StubType,
    pub parameters: Vec<FunctionParameterStub>,
    pub type_parameters: Vec<TypeParameterStub>,
    pub receiver: Option<StubType>,
    pub flags: StubFlags,
    pub annotations: Vec<AnnotationStub>,
    pub mangled_name: String,
}

impl FunctionStub {
    /// Glue symbol named by the `CCall` annotation, if any.
    pub fn ccall_id(&self) -> Option<&str> {
        ccall_id(&self.annotations)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstructorStub {
    pub parameters: Vec<FunctionParameterStub>,
    pub flags: StubFlags,
    pub annotations: Vec<AnnotationStub>,
}

// ── Properties ─────────────────────────────────────────────────────

/// Literal value of a `Constant` property.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstantStub {
    Integer(i64),
    /// IEEE-754 bits, so the tree stays `Eq`.
    Double(u64),
    String(String),
}

impl ConstantStub {
    pub fn double(value: f64) -> Self {
        ConstantStub::Double(value.to_bits())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstantStub::Double(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyKind {
    Val { getter: PropertyAccessor },
    Var {
        getter: PropertyAccessor,
        setter: PropertyAccessor,
    },
    Constant { value: ConstantStub },
    LateinitVar,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyStub {
    pub name: String,
    pub ty: StubType,
    pub kind: PropertyKind,
    pub receiver: Option<StubType>,
    pub flags: StubFlags,
    pub annotations: Vec<AnnotationStub>,
    pub mangled_name: String,
}

impl PropertyStub {
    pub fn accessors(&self) -> impl Iterator<Item = &PropertyAccessor> {
        let (getter, setter) = match &self.kind {
            PropertyKind::Val { getter } => (Some(getter), None),
            PropertyKind::Var { getter, setter } => (Some(getter), Some(setter)),
            PropertyKind::Constant { .. } | PropertyKind::LateinitVar => (None, None),
        };
        getter.into_iter().chain(setter)
    }

    pub fn is_var(&self) -> bool {
        matches!(
            self.kind,
            PropertyKind::Var { .. } | PropertyKind::LateinitVar
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AccessorKind {
    Getter,
    /// The setter's single parameter is always named `value`.
    Setter { parameter: FunctionParameterStub },
}

impl AccessorKind {
    pub const fn name(&self) -> &'static str {
        match self {
            AccessorKind::Getter => "<get>",
            AccessorKind::Setter { .. } => "<set>",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyAccessor {
    pub kind: AccessorKind,
    pub flags: StubFlags,
    pub annotations: Vec<AnnotationStub>,
}

impl PropertyAccessor {
    pub const SETTER_PARAMETER: &'static str = "value";

    pub fn getter(flags: StubFlags, annotations: Vec<AnnotationStub>) -> Self {
        PropertyAccessor {
            kind: AccessorKind::Getter,
            flags,
            annotations,
        }
    }

    pub fn setter(ty: StubType, flags: StubFlags, annotations: Vec<AnnotationStub>) -> Self {
        PropertyAccessor {
            kind: AccessorKind::Setter {
                parameter: FunctionParameterStub::new(Self::SETTER_PARAMETER, ty),
            },
            flags,
            annotations,
        }
    }

    pub fn ccall_id(&self) -> Option<&str> {
        ccall_id(&self.annotations)
    }
}

// ── Containers ─────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Default)]
pub struct StubContainer {
    pub name: String,
    pub children: Vec<Stub>,
}

impl StubContainer {
    pub fn new(name: impl Into<String>) -> Self {
        StubContainer {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, stub: Stub) {
        self.children.push(stub);
    }

    /// Every function in the tree, depth-first.
    pub fn functions(&self) -> Vec<&FunctionStub> {
        let mut out = Vec::new();
        for child in &self.children {
            child.walk(&mut |s| {
                if let Stub::Function(f) = s {
                    out.push(f);
                }
            });
        }
        out
    }
}

fn ccall_id(annotations: &[AnnotationStub]) -> Option<&str> {
    annotations.iter().find_map(|a| match a {
        AnnotationStub::CCall { id } => Some(id.as_str()),
        _ => None,
    })
}

#[cfg(test)]
mod tests;
