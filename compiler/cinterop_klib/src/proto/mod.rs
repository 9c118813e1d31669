//! Serialized package fragments.
//!
//! A fragment is the interned form of a [`PackageDescriptor`]: every name
//! is a [`StringId`], every type a [`TypeId`], every constant a [`BodyId`].
//! The ids index tables owned by the same fragment and are meaningless
//! outside it.
//!
//! Fragments also carry a symbol table listing each top-level declaration
//! with its [`UniqId`], so a reader can find a declaration by identity and
//! decode only that one.

use std::collections::BTreeMap;

use cinterop_ir::UniqId;
use serde::{Deserialize, Serialize};

use crate::descriptor::{
    AccessorDescriptor, AnnotationArgument, AnnotationDescriptor, ClassDescriptor,
    ClassDescriptorKind, ConstantValue, ConstructorDescriptor, DeclFlags, FunctionDescriptor,
    PackageDescriptor, ProjectionVariance, PropertyDescriptor, TypeAliasDescriptor,
    TypeArgumentDescriptor, TypeDescriptor, TypeKind, TypeParameterDescriptor,
    ValueParameterDescriptor,
};
use crate::error::KlibError;
use crate::table::{StringId, StringTable, TableBuilder, TypeId, TypeTable};

/// Index into a fragment's bodies table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(u32);

impl BodyId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        BodyId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Index into a fragment's symbol table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        SymbolId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

// ── Proto types ────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtoTypeKind {
    Class {
        name: StringId,
        uniq_id: Option<UniqId>,
    },
    TypeParameter(u32),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtoTypeArgument {
    Star,
    Projection {
        variance: ProjectionVariance,
        ty: TypeId,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtoType {
    pub kind: ProtoTypeKind,
    pub arguments: Vec<ProtoTypeArgument>,
    pub nullable: bool,
    pub abbreviation: Option<TypeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtoArgument {
    String(StringId),
    Long(i64),
    Int(i32),
    Boolean(bool),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoAnnotation {
    pub class_name: StringId,
    pub arguments: Vec<(StringId, ProtoArgument)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoTypeParameter {
    pub id: u32,
    pub name: StringId,
    pub upper_bounds: Vec<TypeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoValueParameter {
    pub name: StringId,
    pub ty: TypeId,
    pub vararg_element_type: Option<TypeId>,
    pub annotations: Vec<ProtoAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoFunction {
    pub name: StringId,
    pub flags: DeclFlags,
    pub uniq_id: UniqId,
    pub type_parameters: Vec<ProtoTypeParameter>,
    pub receiver: Option<TypeId>,
    pub value_parameters: Vec<ProtoValueParameter>,
    pub return_type: TypeId,
    pub annotations: Vec<ProtoAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoAccessor {
    pub flags: DeclFlags,
    pub annotations: Vec<ProtoAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoProperty {
    pub name: StringId,
    pub flags: DeclFlags,
    pub uniq_id: UniqId,
    pub ty: TypeId,
    pub receiver: Option<TypeId>,
    pub getter: Option<ProtoAccessor>,
    pub setter: Option<ProtoAccessor>,
    pub constant: Option<BodyId>,
    pub annotations: Vec<ProtoAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoConstructor {
    pub flags: DeclFlags,
    pub value_parameters: Vec<ProtoValueParameter>,
    pub annotations: Vec<ProtoAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoClass {
    pub name: StringId,
    pub kind: ClassDescriptorKind,
    pub flags: DeclFlags,
    pub uniq_id: UniqId,
    pub type_parameters: Vec<ProtoTypeParameter>,
    pub supertypes: Vec<TypeId>,
    pub constructors: Vec<ProtoConstructor>,
    pub functions: Vec<ProtoFunction>,
    pub properties: Vec<ProtoProperty>,
    pub annotations: Vec<ProtoAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoTypeAlias {
    pub name: StringId,
    pub flags: DeclFlags,
    pub uniq_id: UniqId,
    pub underlying: TypeId,
    pub expanded: TypeId,
    pub annotations: Vec<ProtoAnnotation>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoPackage {
    pub classes: Vec<ProtoClass>,
    pub functions: Vec<ProtoFunction>,
    pub properties: Vec<ProtoProperty>,
    pub type_aliases: Vec<ProtoTypeAlias>,
}

// ── Fragment ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Class,
    Function,
    Property,
    TypeAlias,
}

/// One top-level declaration of a fragment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub uniq_id: UniqId,
    pub name: StringId,
    pub kind: DeclKind,
    /// Position in the matching `ProtoPackage` vector.
    pub index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFragment {
    pub fq_name: String,
    pub strings: StringTable,
    pub types: TypeTable,
    pub package: ProtoPackage,
    pub bodies: Vec<ConstantValue>,
    pub symbols: Vec<SymbolEntry>,
    /// Structural placeholder with no declarations.
    pub is_empty: bool,
}

impl PackageFragment {
    /// A placeholder fragment for `fq_name`.
    pub fn empty(fq_name: impl Into<String>) -> Self {
        PackageFragment {
            fq_name: fq_name.into(),
            strings: StringTable::default(),
            types: TypeTable::default(),
            package: ProtoPackage::default(),
            bodies: Vec::new(),
            symbols: Vec::new(),
            is_empty: true,
        }
    }

    pub fn decoder(&self) -> FragmentDecoder<'_> {
        FragmentDecoder { fragment: self }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, KlibError> {
        bincode::serialize(self).map_err(|source| KlibError::Encode {
            what: "package fragment",
            source,
        })
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, KlibError> {
        bincode::deserialize(bytes).map_err(|source| KlibError::Decode {
            what: "package fragment",
            source,
        })
    }
}

// ── Encoding ───────────────────────────────────────────────────────

/// Intern a package descriptor into a fragment.
pub fn encode_package(package: &PackageDescriptor) -> PackageFragment {
    let mut enc = Encoder::default();
    let mut proto = ProtoPackage::default();
    let mut symbols = Vec::new();

    for (i, class) in package.classes.iter().enumerate() {
        let p = enc.class(class);
        symbols.push(SymbolEntry {
            uniq_id: p.uniq_id,
            name: p.name,
            kind: DeclKind::Class,
            index: index_u32(i),
        });
        proto.classes.push(p);
    }
    for (i, function) in package.functions.iter().enumerate() {
        let p = enc.function(function);
        symbols.push(SymbolEntry {
            uniq_id: p.uniq_id,
            name: p.name,
            kind: DeclKind::Function,
            index: index_u32(i),
        });
        proto.functions.push(p);
    }
    for (i, property) in package.properties.iter().enumerate() {
        let p = enc.property(property);
        symbols.push(SymbolEntry {
            uniq_id: p.uniq_id,
            name: p.name,
            kind: DeclKind::Property,
            index: index_u32(i),
        });
        proto.properties.push(p);
    }
    for (i, alias) in package.type_aliases.iter().enumerate() {
        let p = enc.type_alias(alias);
        symbols.push(SymbolEntry {
            uniq_id: p.uniq_id,
            name: p.name,
            kind: DeclKind::TypeAlias,
            index: index_u32(i),
        });
        proto.type_aliases.push(p);
    }

    tracing::debug!(
        package = %package.fq_name,
        strings = enc.strings.len(),
        types = enc.types.len(),
        symbols = symbols.len(),
        "encoded package fragment"
    );

    PackageFragment {
        fq_name: package.fq_name.clone(),
        strings: enc.strings.finish(),
        types: enc.types.finish(),
        package: proto,
        bodies: enc.bodies,
        symbols,
        is_empty: package.is_empty(),
    }
}

#[inline]
fn index_u32(i: usize) -> u32 {
    u32::try_from(i).unwrap_or(u32::MAX)
}

#[derive(Default)]
struct Encoder {
    strings: TableBuilder<String>,
    types: TableBuilder<ProtoType>,
    bodies: Vec<ConstantValue>,
}

impl Encoder {
    fn string(&mut self, s: &str) -> StringId {
        self.strings.intern_str(s)
    }

    fn ty(&mut self, ty: &TypeDescriptor) -> TypeId {
        let kind = match &ty.kind {
            TypeKind::Class { name, uniq_id } => ProtoTypeKind::Class {
                name: self.string(name),
                uniq_id: *uniq_id,
            },
            TypeKind::TypeParameter(id) => ProtoTypeKind::TypeParameter(*id),
        };
        let arguments = ty
            .arguments
            .iter()
            .map(|arg| match arg {
                TypeArgumentDescriptor::Star => ProtoTypeArgument::Star,
                TypeArgumentDescriptor::Projection { variance, ty } => {
                    ProtoTypeArgument::Projection {
                        variance: *variance,
                        ty: self.ty(ty),
                    }
                }
            })
            .collect();
        let abbreviation = ty.abbreviation.as_deref().map(|a| self.ty(a));
        self.types.intern_type(ProtoType {
            kind,
            arguments,
            nullable: ty.nullable,
            abbreviation,
        })
    }

    fn annotations(&mut self, annotations: &[AnnotationDescriptor]) -> Vec<ProtoAnnotation> {
        annotations
            .iter()
            .map(|a| ProtoAnnotation {
                class_name: self.string(&a.class_name),
                arguments: a
                    .arguments
                    .iter()
                    .map(|(name, value)| {
                        let value = match value {
                            AnnotationArgument::String(s) => ProtoArgument::String(self.string(s)),
                            AnnotationArgument::Long(v) => ProtoArgument::Long(*v),
                            AnnotationArgument::Int(v) => ProtoArgument::Int(*v),
                            AnnotationArgument::Boolean(v) => ProtoArgument::Boolean(*v),
                        };
                        (self.string(name), value)
                    })
                    .collect(),
            })
            .collect()
    }

    fn type_parameters(&mut self, params: &[TypeParameterDescriptor]) -> Vec<ProtoTypeParameter> {
        params
            .iter()
            .map(|p| ProtoTypeParameter {
                id: p.id,
                name: self.string(&p.name),
                upper_bounds: p.upper_bounds.iter().map(|b| self.ty(b)).collect(),
            })
            .collect()
    }

    fn value_parameters(&mut self, params: &[ValueParameterDescriptor]) -> Vec<ProtoValueParameter> {
        params
            .iter()
            .map(|p| ProtoValueParameter {
                name: self.string(&p.name),
                ty: self.ty(&p.ty),
                vararg_element_type: p.vararg_element_type.as_ref().map(|t| self.ty(t)),
                annotations: self.annotations(&p.annotations),
            })
            .collect()
    }

    fn accessor(&mut self, accessor: &AccessorDescriptor) -> ProtoAccessor {
        ProtoAccessor {
            flags: accessor.flags,
            annotations: self.annotations(&accessor.annotations),
        }
    }

    fn function(&mut self, f: &FunctionDescriptor) -> ProtoFunction {
        ProtoFunction {
            name: self.string(&f.name),
            flags: f.flags,
            uniq_id: f.uniq_id,
            type_parameters: self.type_parameters(&f.type_parameters),
            receiver: f.receiver.as_ref().map(|r| self.ty(r)),
            value_parameters: self.value_parameters(&f.value_parameters),
            return_type: self.ty(&f.return_type),
            annotations: self.annotations(&f.annotations),
        }
    }

    fn property(&mut self, p: &PropertyDescriptor) -> ProtoProperty {
        let constant = p.constant.as_ref().map(|value| {
            let id = BodyId(index_u32(self.bodies.len()));
            self.bodies.push(value.clone());
            id
        });
        ProtoProperty {
            name: self.string(&p.name),
            flags: p.flags,
            uniq_id: p.uniq_id,
            ty: self.ty(&p.ty),
            receiver: p.receiver.as_ref().map(|r| self.ty(r)),
            getter: p.getter.as_ref().map(|a| self.accessor(a)),
            setter: p.setter.as_ref().map(|a| self.accessor(a)),
            constant,
            annotations: self.annotations(&p.annotations),
        }
    }

    fn class(&mut self, c: &ClassDescriptor) -> ProtoClass {
        ProtoClass {
            name: self.string(&c.name),
            kind: c.kind,
            flags: c.flags,
            uniq_id: c.uniq_id,
            type_parameters: self.type_parameters(&c.type_parameters),
            supertypes: c.supertypes.iter().map(|s| self.ty(s)).collect(),
            constructors: c
                .constructors
                .iter()
                .map(|k| ProtoConstructor {
                    flags: k.flags,
                    value_parameters: self.value_parameters(&k.value_parameters),
                    annotations: self.annotations(&k.annotations),
                })
                .collect(),
            functions: c.functions.iter().map(|f| self.function(f)).collect(),
            properties: c.properties.iter().map(|p| self.property(p)).collect(),
            annotations: self.annotations(&c.annotations),
        }
    }

    fn type_alias(&mut self, t: &TypeAliasDescriptor) -> ProtoTypeAlias {
        ProtoTypeAlias {
            name: self.string(&t.name),
            flags: t.flags,
            uniq_id: t.uniq_id,
            underlying: self.ty(&t.underlying),
            expanded: self.ty(&t.expanded),
            annotations: self.annotations(&t.annotations),
        }
    }
}

// ── Decoding ───────────────────────────────────────────────────────

/// Reads declarations out of one fragment on demand.
#[derive(Clone, Copy)]
pub struct FragmentDecoder<'a> {
    fragment: &'a PackageFragment,
}

impl<'a> FragmentDecoder<'a> {
    fn bad_index(&self, table: &'static str, index: u32) -> KlibError {
        KlibError::BadIndex {
            fragment: self.fragment.fq_name.clone(),
            table,
            index,
        }
    }

    pub fn string(&self, id: StringId) -> Result<&'a str, KlibError> {
        self.fragment
            .strings
            .get(id)
            .ok_or_else(|| self.bad_index("string", id.raw()))
    }

    pub fn body(&self, id: BodyId) -> Result<&'a ConstantValue, KlibError> {
        self.fragment
            .bodies
            .get(id.0 as usize)
            .ok_or_else(|| self.bad_index("body", id.0))
    }

    pub fn symbol(&self, id: SymbolId) -> Result<&'a SymbolEntry, KlibError> {
        self.fragment
            .symbols
            .get(id.0 as usize)
            .ok_or_else(|| self.bad_index("symbol", id.0))
    }

    /// Symbol whose identity is `uniq_id`, if this fragment declares it.
    pub fn find_symbol(&self, uniq_id: UniqId) -> Option<SymbolId> {
        self.fragment
            .symbols
            .iter()
            .position(|s| s.uniq_id == uniq_id)
            .map(|i| SymbolId(index_u32(i)))
    }

    pub fn ty(&self, id: TypeId) -> Result<TypeDescriptor, KlibError> {
        let proto = self
            .fragment
            .types
            .get(id)
            .ok_or_else(|| self.bad_index("type", id.raw()))?;
        let kind = match &proto.kind {
            ProtoTypeKind::Class { name, uniq_id } => TypeKind::Class {
                name: self.string(*name)?.to_owned(),
                uniq_id: *uniq_id,
            },
            ProtoTypeKind::TypeParameter(id) => TypeKind::TypeParameter(*id),
        };
        let arguments = proto
            .arguments
            .iter()
            .map(|arg| {
                Ok(match arg {
                    ProtoTypeArgument::Star => TypeArgumentDescriptor::Star,
                    ProtoTypeArgument::Projection { variance, ty } => {
                        TypeArgumentDescriptor::Projection {
                            variance: *variance,
                            ty: self.ty(*ty)?,
                        }
                    }
                })
            })
            .collect::<Result<_, KlibError>>()?;
        let abbreviation = proto
            .abbreviation
            .map(|a| self.ty(a).map(Box::new))
            .transpose()?;
        Ok(TypeDescriptor {
            kind,
            arguments,
            nullable: proto.nullable,
            abbreviation,
        })
    }

    fn annotations(&self, annotations: &[ProtoAnnotation]) -> Result<Vec<AnnotationDescriptor>, KlibError> {
        annotations
            .iter()
            .map(|a| {
                let mut arguments = BTreeMap::new();
                for (name, value) in &a.arguments {
                    let value = match value {
                        ProtoArgument::String(s) => {
                            AnnotationArgument::String(self.string(*s)?.to_owned())
                        }
                        ProtoArgument::Long(v) => AnnotationArgument::Long(*v),
                        ProtoArgument::Int(v) => AnnotationArgument::Int(*v),
                        ProtoArgument::Boolean(v) => AnnotationArgument::Boolean(*v),
                    };
                    arguments.insert(self.string(*name)?.to_owned(), value);
                }
                Ok(AnnotationDescriptor {
                    class_name: self.string(a.class_name)?.to_owned(),
                    arguments,
                })
            })
            .collect()
    }

    fn type_parameters(
        &self,
        params: &[ProtoTypeParameter],
    ) -> Result<Vec<TypeParameterDescriptor>, KlibError> {
        params
            .iter()
            .map(|p| {
                Ok(TypeParameterDescriptor {
                    id: p.id,
                    name: self.string(p.name)?.to_owned(),
                    upper_bounds: p
                        .upper_bounds
                        .iter()
                        .map(|b| self.ty(*b))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect()
    }

    fn value_parameters(
        &self,
        params: &[ProtoValueParameter],
    ) -> Result<Vec<ValueParameterDescriptor>, KlibError> {
        params
            .iter()
            .map(|p| {
                Ok(ValueParameterDescriptor {
                    name: self.string(p.name)?.to_owned(),
                    ty: self.ty(p.ty)?,
                    vararg_element_type: p.vararg_element_type.map(|t| self.ty(t)).transpose()?,
                    annotations: self.annotations(&p.annotations)?,
                })
            })
            .collect()
    }

    fn accessor(&self, a: &ProtoAccessor) -> Result<AccessorDescriptor, KlibError> {
        Ok(AccessorDescriptor {
            flags: a.flags,
            annotations: self.annotations(&a.annotations)?,
        })
    }

    fn decode_function(&self, f: &ProtoFunction) -> Result<FunctionDescriptor, KlibError> {
        Ok(FunctionDescriptor {
            name: self.string(f.name)?.to_owned(),
            flags: f.flags,
            uniq_id: f.uniq_id,
            type_parameters: self.type_parameters(&f.type_parameters)?,
            receiver: f.receiver.map(|r| self.ty(r)).transpose()?,
            value_parameters: self.value_parameters(&f.value_parameters)?,
            return_type: self.ty(f.return_type)?,
            annotations: self.annotations(&f.annotations)?,
        })
    }

    fn decode_property(&self, p: &ProtoProperty) -> Result<PropertyDescriptor, KlibError> {
        Ok(PropertyDescriptor {
            name: self.string(p.name)?.to_owned(),
            flags: p.flags,
            uniq_id: p.uniq_id,
            ty: self.ty(p.ty)?,
            receiver: p.receiver.map(|r| self.ty(r)).transpose()?,
            getter: p.getter.as_ref().map(|a| self.accessor(a)).transpose()?,
            setter: p.setter.as_ref().map(|a| self.accessor(a)).transpose()?,
            constant: p.constant.map(|b| self.body(b).cloned()).transpose()?,
            annotations: self.annotations(&p.annotations)?,
        })
    }

    fn decode_class(&self, c: &ProtoClass) -> Result<ClassDescriptor, KlibError> {
        Ok(ClassDescriptor {
            name: self.string(c.name)?.to_owned(),
            kind: c.kind,
            flags: c.flags,
            uniq_id: c.uniq_id,
            type_parameters: self.type_parameters(&c.type_parameters)?,
            supertypes: c
                .supertypes
                .iter()
                .map(|s| self.ty(*s))
                .collect::<Result<_, _>>()?,
            constructors: c
                .constructors
                .iter()
                .map(|k| {
                    Ok(ConstructorDescriptor {
                        flags: k.flags,
                        value_parameters: self.value_parameters(&k.value_parameters)?,
                        annotations: self.annotations(&k.annotations)?,
                    })
                })
                .collect::<Result<_, KlibError>>()?,
            functions: c
                .functions
                .iter()
                .map(|f| self.decode_function(f))
                .collect::<Result<_, _>>()?,
            properties: c
                .properties
                .iter()
                .map(|p| self.decode_property(p))
                .collect::<Result<_, _>>()?,
            annotations: self.annotations(&c.annotations)?,
        })
    }

    fn decode_type_alias(&self, t: &ProtoTypeAlias) -> Result<TypeAliasDescriptor, KlibError> {
        Ok(TypeAliasDescriptor {
            name: self.string(t.name)?.to_owned(),
            flags: t.flags,
            uniq_id: t.uniq_id,
            underlying: self.ty(t.underlying)?,
            expanded: self.ty(t.expanded)?,
            annotations: self.annotations(&t.annotations)?,
        })
    }

    pub fn class(&self, index: u32) -> Result<ClassDescriptor, KlibError> {
        let proto = self
            .fragment
            .package
            .classes
            .get(index as usize)
            .ok_or_else(|| self.bad_index("class", index))?;
        self.decode_class(proto)
    }

    pub fn function(&self, index: u32) -> Result<FunctionDescriptor, KlibError> {
        let proto = self
            .fragment
            .package
            .functions
            .get(index as usize)
            .ok_or_else(|| self.bad_index("function", index))?;
        self.decode_function(proto)
    }

    pub fn property(&self, index: u32) -> Result<PropertyDescriptor, KlibError> {
        let proto = self
            .fragment
            .package
            .properties
            .get(index as usize)
            .ok_or_else(|| self.bad_index("property", index))?;
        self.decode_property(proto)
    }

    pub fn type_alias(&self, index: u32) -> Result<TypeAliasDescriptor, KlibError> {
        let proto = self
            .fragment
            .package
            .type_aliases
            .get(index as usize)
            .ok_or_else(|| self.bad_index("typealias", index))?;
        self.decode_type_alias(proto)
    }

    /// Decode the whole package.
    pub fn package(&self) -> Result<PackageDescriptor, KlibError> {
        let p = &self.fragment.package;
        Ok(PackageDescriptor {
            fq_name: self.fragment.fq_name.clone(),
            classes: p
                .classes
                .iter()
                .map(|c| self.decode_class(c))
                .collect::<Result<_, _>>()?,
            functions: p
                .functions
                .iter()
                .map(|f| self.decode_function(f))
                .collect::<Result<_, _>>()?,
            properties: p
                .properties
                .iter()
                .map(|x| self.decode_property(x))
                .collect::<Result<_, _>>()?,
            type_aliases: p
                .type_aliases
                .iter()
                .map(|t| self.decode_type_alias(t))
                .collect::<Result<_, _>>()?,
        })
    }
}

#[cfg(test)]
mod tests;
