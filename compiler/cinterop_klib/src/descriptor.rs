//! In-memory package descriptors.
//!
//! This is the uninterned form of a package: names are strings, types are
//! trees. [`encode_package`](crate::encode_package) turns it into a
//! fragment with string and type tables; [`FragmentDecoder`](crate::FragmentDecoder)
//! turns fragment entries back into these types one declaration at a time.

use std::collections::BTreeMap;

use bitflags::bitflags;
use cinterop_ir::UniqId;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Declaration flags as stored in metadata.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DeclFlags: u16 {
        const PUBLIC = 1 << 0;
        const FINAL = 1 << 1;
        const EXTERNAL = 1 << 2;
        const HAS_ANNOTATIONS = 1 << 3;
        const VAR = 1 << 4;
        const CONST = 1 << 5;
        const LATEINIT = 1 << 6;
        const HAS_GETTER = 1 << 7;
        const HAS_SETTER = 1 << 8;
        /// A real declaration, not a fake override or delegation.
        const DECLARATION = 1 << 9;
    }
}

// ── Types ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Serialized fq name (`pkg/sub/Name`) plus identity for cross-library links.
    Class {
        name: String,
        uniq_id: Option<UniqId>,
    },
    TypeParameter(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionVariance {
    Invariant,
    In,
    Out,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeArgumentDescriptor {
    Star,
    Projection {
        variance: ProjectionVariance,
        ty: TypeDescriptor,
    },
}

/// A type reference. For typealias uses, `kind` is the expansion and
/// `abbreviation` the alias.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    pub arguments: Vec<TypeArgumentDescriptor>,
    pub nullable: bool,
    pub abbreviation: Option<Box<TypeDescriptor>>,
}

impl TypeDescriptor {
    pub fn class(name: impl Into<String>, uniq_id: Option<UniqId>) -> Self {
        TypeDescriptor {
            kind: TypeKind::Class {
                name: name.into(),
                uniq_id,
            },
            arguments: Vec::new(),
            nullable: false,
            abbreviation: None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Class { name, .. } => Some(name),
            TypeKind::TypeParameter(_) => None,
        }
    }

    /// Rewrite every class identity in this type, arguments and
    /// abbreviation included.
    pub fn remap_uniq_ids(&mut self, f: &mut impl FnMut(UniqId) -> UniqId) {
        if let TypeKind::Class {
            uniq_id: Some(id), ..
        } = &mut self.kind
        {
            *id = f(*id);
        }
        for arg in &mut self.arguments {
            if let TypeArgumentDescriptor::Projection { ty, .. } = arg {
                ty.remap_uniq_ids(f);
            }
        }
        if let Some(abbreviation) = &mut self.abbreviation {
            abbreviation.remap_uniq_ids(f);
        }
    }

    /// Every class identity referenced by this type.
    pub fn uniq_ids(&self, out: &mut Vec<UniqId>) {
        if let TypeKind::Class {
            uniq_id: Some(id), ..
        } = &self.kind
        {
            out.push(*id);
        }
        for arg in &self.arguments {
            if let TypeArgumentDescriptor::Projection { ty, .. } = arg {
                ty.uniq_ids(out);
            }
        }
        if let Some(abbreviation) = &self.abbreviation {
            abbreviation.uniq_ids(out);
        }
    }
}

// ── Annotations ────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationArgument {
    String(String),
    Long(i64),
    Int(i32),
    Boolean(bool),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationDescriptor {
    /// Serialized fq name of the annotation class.
    pub class_name: String,
    pub arguments: BTreeMap<String, AnnotationArgument>,
}

impl AnnotationDescriptor {
    pub fn argument(&self, name: &str) -> Option<&AnnotationArgument> {
        self.arguments.get(name)
    }
}

// ── Declarations ───────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParameterDescriptor {
    pub id: u32,
    pub name: String,
    pub upper_bounds: Vec<TypeDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueParameterDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    /// Element type of a vararg parameter.
    pub vararg_element_type: Option<TypeDescriptor>,
    pub annotations: Vec<AnnotationDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub flags: DeclFlags,
    pub uniq_id: UniqId,
    pub type_parameters: Vec<TypeParameterDescriptor>,
    pub receiver: Option<TypeDescriptor>,
    pub value_parameters: Vec<ValueParameterDescriptor>,
    pub return_type: TypeDescriptor,
    pub annotations: Vec<AnnotationDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorDescriptor {
    pub flags: DeclFlags,
    pub annotations: Vec<AnnotationDescriptor>,
}

/// Compile-time value of a constant property.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstantValue {
    Integer(i64),
    /// IEEE-754 bits.
    Double(u64),
    String(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub flags: DeclFlags,
    pub uniq_id: UniqId,
    pub ty: TypeDescriptor,
    pub receiver: Option<TypeDescriptor>,
    pub getter: Option<AccessorDescriptor>,
    /// The setter's parameter is implicit: `value` of the property type.
    pub setter: Option<AccessorDescriptor>,
    pub constant: Option<ConstantValue>,
    pub annotations: Vec<AnnotationDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDescriptor {
    pub flags: DeclFlags,
    pub value_parameters: Vec<ValueParameterDescriptor>,
    pub annotations: Vec<AnnotationDescriptor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassDescriptorKind {
    Class,
    Interface,
    /// Forward-declared placeholder with no members.
    Opaque,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Serialized fq name (`pkg/sub/Name`).
    pub name: String,
    pub kind: ClassDescriptorKind,
    pub flags: DeclFlags,
    pub uniq_id: UniqId,
    pub type_parameters: Vec<TypeParameterDescriptor>,
    pub supertypes: Vec<TypeDescriptor>,
    pub constructors: Vec<ConstructorDescriptor>,
    pub functions: Vec<FunctionDescriptor>,
    pub properties: Vec<PropertyDescriptor>,
    pub annotations: Vec<AnnotationDescriptor>,
}

impl ClassDescriptor {
    /// Last segment of the serialized name.
    pub fn simple_name(&self) -> &str {
        let relative = self.name.rsplit('/').next().unwrap_or(&self.name);
        relative.rsplit('.').next().unwrap_or(relative)
    }

    pub fn member_count(&self) -> usize {
        self.constructors.len() + self.functions.len() + self.properties.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAliasDescriptor {
    pub name: String,
    pub flags: DeclFlags,
    pub uniq_id: UniqId,
    pub underlying: TypeDescriptor,
    pub expanded: TypeDescriptor,
    pub annotations: Vec<AnnotationDescriptor>,
}

/// Everything declared in one package.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub fq_name: String,
    pub classes: Vec<ClassDescriptor>,
    pub functions: Vec<FunctionDescriptor>,
    pub properties: Vec<PropertyDescriptor>,
    pub type_aliases: Vec<TypeAliasDescriptor>,
}

impl PackageDescriptor {
    pub fn new(fq_name: impl Into<String>) -> Self {
        PackageDescriptor {
            fq_name: fq_name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.functions.is_empty()
            && self.properties.is_empty()
            && self.type_aliases.is_empty()
    }
}
