//! Stub IR → package descriptor.
//!
//! The emitter makes two passes over the tree. The first records the
//! [`UniqId`] of every class and typealias declared here, so a type that
//! refers to a declaration later in the tree still gets its identity. The
//! second converts declarations; class members go into the innermost open
//! class, everything else into the package. Nested classes are flattened
//! into the package under their dotted relative name, after their outer
//! class.
//!
//! Type identities:
//!
//! | Referenced classifier | `uniq_id` |
//! |-----------------------|-----------|
//! | declared in this tree | hash of its mangled name |
//! | forward-declaration placeholder | hash of the placeholder's mangled name |
//! | builtin, runtime or imported | `None`, linked by name |

use std::collections::BTreeMap;

use cinterop_ir::{
    AnnotationStub, AnnotationValue, ClassKind, ClassStub, Classifier, ConstantStub,
    ConstructorStub, FunctionParameterStub, FunctionStub, PropertyAccessor, PropertyKind,
    PropertyStub, Stub, StubContainer, StubFlags, StubIrVisitor, StubType, TypeAliasStub,
    TypeArgument, TypeParameterInterner, TypeParameterStub, UniqId, UnsupportedStub, Variance,
};
use cinterop_klib::{
    AccessorDescriptor, AnnotationArgument, AnnotationDescriptor, ClassDescriptor,
    ClassDescriptorKind, ConstantValue, ConstructorDescriptor, DeclFlags, FunctionDescriptor,
    PackageDescriptor, ProjectionVariance, PropertyDescriptor, TypeAliasDescriptor,
    TypeArgumentDescriptor, TypeDescriptor, TypeKind, TypeParameterDescriptor,
    ValueParameterDescriptor,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::EmitError;
use crate::mangle::{forward_declaration_id, hash_mangle};

/// Builds the metadata form of one package.
#[derive(Debug)]
pub struct MetadataEmitter {
    package: PackageDescriptor,
    declared: FxHashMap<Classifier, UniqId>,
    type_parameters: TypeParameterInterner,
    /// Classes whose members are being emitted, innermost last.
    scopes: SmallVec<[ClassDescriptor; 2]>,
}

impl MetadataEmitter {
    pub fn new(package: impl Into<String>) -> Self {
        MetadataEmitter {
            package: PackageDescriptor::new(package),
            declared: FxHashMap::default(),
            type_parameters: TypeParameterInterner::new(),
            scopes: SmallVec::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(package = %root.name))]
    pub fn emit(root: &StubContainer) -> Result<PackageDescriptor, EmitError> {
        let mut emitter = MetadataEmitter::new(root.name.clone());
        emitter.collect_identities(root);
        for child in &root.children {
            child.accept(&mut emitter)?;
        }
        tracing::debug!(
            classes = emitter.package.classes.len(),
            functions = emitter.package.functions.len(),
            properties = emitter.package.properties.len(),
            type_aliases = emitter.package.type_aliases.len(),
            "emitted package metadata"
        );
        Ok(emitter.package)
    }

    fn collect_identities(&mut self, root: &StubContainer) {
        let declared = &mut self.declared;
        for child in &root.children {
            child.walk(&mut |stub| match stub {
                Stub::Class(c) => {
                    declared.insert(c.classifier.clone(), hash_mangle(&c.mangled_name));
                }
                Stub::TypeAlias(t) => {
                    declared.insert(t.alias.clone(), hash_mangle(&t.mangled_name));
                }
                _ => {}
            });
        }
    }

    fn identity(&self, classifier: &Classifier) -> Option<UniqId> {
        self.declared
            .get(classifier)
            .copied()
            .or_else(|| forward_declaration_id(classifier))
    }

    // ── Types ──────────────────────────────────────────────────────

    fn ty(&mut self, ty: &StubType) -> TypeDescriptor {
        match ty {
            StubType::Classifier {
                classifier,
                type_arguments,
                nullable,
            } => {
                let uniq_id = self.identity(classifier);
                self.class_type(classifier, uniq_id, type_arguments, *nullable)
            }
            StubType::Wrapper {
                classifier,
                type_arguments,
                nullable,
            } => self.class_type(classifier, None, type_arguments, *nullable),
            StubType::Nested {
                outer,
                name,
                nullable,
            } => {
                let classifier = outer.nested(name);
                let uniq_id = self.identity(&classifier);
                self.class_type(&classifier, uniq_id, &[], *nullable)
            }
            StubType::TypeParameter { key, nullable } => TypeDescriptor {
                kind: TypeKind::TypeParameter(self.type_parameters.intern(key)),
                arguments: Vec::new(),
                nullable: *nullable,
                abbreviation: None,
            },
            StubType::Abbreviation {
                alias,
                expanded,
                nullable,
            } => {
                let mut expansion = self.ty(expanded);
                expansion.nullable = *nullable;
                let mut abbreviation =
                    TypeDescriptor::class(alias.fq_name_serialized(), self.identity(alias));
                abbreviation.nullable = *nullable;
                expansion.abbreviation = Some(Box::new(abbreviation));
                expansion
            }
        }
    }

    fn class_type(
        &mut self,
        classifier: &Classifier,
        uniq_id: Option<UniqId>,
        arguments: &[TypeArgument],
        nullable: bool,
    ) -> TypeDescriptor {
        let mut out = TypeDescriptor::class(classifier.fq_name_serialized(), uniq_id);
        out.nullable = nullable;
        out.arguments = arguments
            .iter()
            .map(|arg| match arg {
                TypeArgument::Star => TypeArgumentDescriptor::Star,
                TypeArgument::Projection { variance, ty } => TypeArgumentDescriptor::Projection {
                    variance: match variance {
                        Variance::Invariant => ProjectionVariance::Invariant,
                        Variance::In => ProjectionVariance::In,
                        Variance::Out => ProjectionVariance::Out,
                    },
                    ty: self.ty(ty),
                },
            })
            .collect();
        out
    }

    fn type_parameter_list(&mut self, params: &[TypeParameterStub]) -> Vec<TypeParameterDescriptor> {
        params
            .iter()
            .map(|p| TypeParameterDescriptor {
                id: self.type_parameters.intern(&p.key),
                name: p.name().to_owned(),
                upper_bounds: p.upper_bound.iter().map(|b| self.ty(b)).collect(),
            })
            .collect()
    }

    fn value_parameters(&mut self, params: &[FunctionParameterStub]) -> Vec<ValueParameterDescriptor> {
        params
            .iter()
            .map(|p| {
                let element = self.ty(&p.ty);
                let (ty, vararg_element_type) = if p.is_vararg {
                    let mut array = TypeDescriptor::class("lang/Array", None);
                    array.arguments.push(TypeArgumentDescriptor::Projection {
                        variance: ProjectionVariance::Out,
                        ty: element.clone(),
                    });
                    (array, Some(element))
                } else {
                    (element, None)
                };
                ValueParameterDescriptor {
                    name: p.name.clone(),
                    ty,
                    vararg_element_type,
                    annotations: annotations(&p.annotations),
                }
            })
            .collect()
    }

    fn accessor(accessor: &PropertyAccessor) -> AccessorDescriptor {
        AccessorDescriptor {
            flags: decl_flags(accessor.flags, &accessor.annotations),
            annotations: annotations(&accessor.annotations),
        }
    }
}

impl StubIrVisitor for MetadataEmitter {
    type Output = ();
    type Error = EmitError;

    fn visit_class(&mut self, class: &ClassStub) -> Result<(), EmitError> {
        let uniq_id = self
            .identity(&class.classifier)
            .unwrap_or_else(|| hash_mangle(&class.mangled_name));
        let kind = match class.kind {
            ClassKind::ObjCProtocol => ClassDescriptorKind::Interface,
            ClassKind::Opaque => ClassDescriptorKind::Opaque,
            ClassKind::Struct | ClassKind::Union | ClassKind::ObjCClass => ClassDescriptorKind::Class,
        };
        let descriptor = ClassDescriptor {
            name: class.classifier.fq_name_serialized(),
            kind,
            flags: decl_flags(class.flags, &class.annotations),
            uniq_id,
            type_parameters: self.type_parameter_list(&class.type_parameters),
            supertypes: class.supertypes.iter().map(|t| self.ty(t)).collect(),
            constructors: Vec::new(),
            functions: Vec::new(),
            properties: Vec::new(),
            annotations: annotations(&class.annotations),
        };

        let slot = self.package.classes.len();
        self.scopes.push(descriptor);
        let result = class.members.iter().try_for_each(|m| m.accept(self));
        let done = self.scopes.pop();
        result?;
        if let Some(done) = done {
            self.package.classes.insert(slot, done);
        }
        Ok(())
    }

    fn visit_type_alias(&mut self, alias: &TypeAliasStub) -> Result<(), EmitError> {
        if !self.scopes.is_empty() {
            return Err(UnsupportedStub::new("nested typealias", alias.alias.fq_name()).into());
        }
        let expanded = self.ty(&alias.aliasee);
        let mut underlying = expanded.clone();
        if let Some(abbreviation) = underlying.abbreviation.take() {
            // The alias of an alias names the inner alias directly.
            underlying = TypeDescriptor {
                abbreviation: None,
                ..*abbreviation
            };
        }
        let descriptor = TypeAliasDescriptor {
            name: alias.alias.fq_name_serialized(),
            flags: decl_flags(alias.flags, &alias.annotations),
            uniq_id: self
                .identity(&alias.alias)
                .unwrap_or_else(|| hash_mangle(&alias.mangled_name)),
            underlying,
            expanded: TypeDescriptor {
                abbreviation: None,
                ..expanded
            },
            annotations: annotations(&alias.annotations),
        };
        self.package.type_aliases.push(descriptor);
        Ok(())
    }

    fn visit_function(&mut self, function: &FunctionStub) -> Result<(), EmitError> {
        let descriptor = FunctionDescriptor {
            name: function.name.clone(),
            flags: decl_flags(function.flags, &function.annotations),
            uniq_id: hash_mangle(&function.mangled_name),
            type_parameters: self.type_parameter_list(&function.type_parameters),
            receiver: function.receiver.as_ref().map(|r| self.ty(r)),
            value_parameters: self.value_parameters(&function.parameters),
            return_type: self.ty(&function.return_type),
            annotations: annotations(&function.annotations),
        };
        match self.scopes.last_mut() {
            Some(class) => class.functions.push(descriptor),
            None => self.package.functions.push(descriptor),
        }
        Ok(())
    }

    fn visit_property(&mut self, property: &PropertyStub) -> Result<(), EmitError> {
        let mut flags = decl_flags(property.flags, &property.annotations);
        let (getter, setter, constant) = match &property.kind {
            PropertyKind::Val { getter } => (Some(Self::accessor(getter)), None, None),
            PropertyKind::Var { getter, setter } => (
                Some(Self::accessor(getter)),
                Some(Self::accessor(setter)),
                None,
            ),
            PropertyKind::Constant { value } => (None, None, Some(constant(value))),
            PropertyKind::LateinitVar => (None, None, None),
        };
        flags.set(DeclFlags::VAR, property.is_var());
        flags.set(DeclFlags::HAS_GETTER, getter.is_some());
        flags.set(DeclFlags::HAS_SETTER, setter.is_some());

        let descriptor = PropertyDescriptor {
            name: property.name.clone(),
            flags,
            uniq_id: hash_mangle(&property.mangled_name),
            ty: self.ty(&property.ty),
            receiver: property.receiver.as_ref().map(|r| self.ty(r)),
            getter,
            setter,
            constant,
            annotations: annotations(&property.annotations),
        };
        match self.scopes.last_mut() {
            Some(class) => class.properties.push(descriptor),
            None => self.package.properties.push(descriptor),
        }
        Ok(())
    }

    fn visit_constructor(&mut self, constructor: &ConstructorStub) -> Result<(), EmitError> {
        if self.scopes.is_empty() {
            return Err(UnsupportedStub::new("constructor", "<init>").into());
        }
        let descriptor = ConstructorDescriptor {
            flags: decl_flags(constructor.flags, &constructor.annotations),
            value_parameters: self.value_parameters(&constructor.parameters),
            annotations: annotations(&constructor.annotations),
        };
        if let Some(class) = self.scopes.last_mut() {
            class.constructors.push(descriptor);
        }
        Ok(())
    }

    fn visit_property_accessor(&mut self, accessor: &PropertyAccessor) -> Result<(), EmitError> {
        Err(UnsupportedStub::new("property accessor", accessor.kind.name()).into())
    }

    fn visit_container(&mut self, container: &StubContainer) -> Result<(), EmitError> {
        container
            .children
            .iter()
            .try_for_each(|child| child.accept(self))
    }
}

fn decl_flags(flags: StubFlags, annotations: &[AnnotationStub]) -> DeclFlags {
    let mut out = DeclFlags::DECLARATION;
    for (stub, decl) in [
        (StubFlags::PUBLIC, DeclFlags::PUBLIC),
        (StubFlags::FINAL, DeclFlags::FINAL),
        (StubFlags::EXTERNAL, DeclFlags::EXTERNAL),
        (StubFlags::CONST, DeclFlags::CONST),
        (StubFlags::LATEINIT, DeclFlags::LATEINIT),
    ] {
        out.set(decl, flags.contains(stub));
    }
    out.set(DeclFlags::HAS_ANNOTATIONS, !annotations.is_empty());
    out
}

fn annotations(annotations: &[AnnotationStub]) -> Vec<AnnotationDescriptor> {
    annotations
        .iter()
        .map(|a| AnnotationDescriptor {
            class_name: a.classifier().fq_name_serialized(),
            arguments: a
                .arguments()
                .into_iter()
                .map(|(key, value)| (key.to_owned(), argument(value)))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect()
}

fn argument(value: AnnotationValue) -> AnnotationArgument {
    match value {
        AnnotationValue::String(s) => AnnotationArgument::String(s),
        AnnotationValue::Long(v) => AnnotationArgument::Long(v),
        AnnotationValue::Int(v) => AnnotationArgument::Int(v),
        AnnotationValue::Boolean(v) => AnnotationArgument::Boolean(v),
    }
}

fn constant(value: &ConstantStub) -> ConstantValue {
    match value {
        ConstantStub::Integer(v) => ConstantValue::Integer(*v),
        ConstantStub::Double(bits) => ConstantValue::Double(*bits),
        ConstantStub::String(s) => ConstantValue::String(s.clone()),
    }
}
