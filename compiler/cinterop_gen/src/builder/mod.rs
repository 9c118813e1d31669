//! Native index → Stub IR.
//!
//! The builder walks the index once, in a fixed order (structs, enums,
//! typedefs, protocols, classes, categories, functions, globals, macro
//! constants, wrapped macros), and projects every declaration into stubs.
//!
//! # Unsupported declarations
//!
//! A declaration whose projection fails is handled by the configured
//! [`UnsupportedPolicy`]: skipped with a [`BuilderDiagnostic`], or the whole
//! build aborts. Skipping is all-or-nothing per declaration: glue requests
//! and forward references recorded while building it are rolled back.
//! Struct fields and Objective-C methods are skipped individually, so one
//! bad field does not drop its struct.
//!
//! # Outputs
//!
//! Besides the stub tree the builder hands the bridge builder one
//! [`BridgeRequest`] per external function or accessor. Each request's
//! symbol equals the `CCall` id on the matching stub.

mod types;

use std::collections::BTreeSet;
use std::fmt;

use cinterop_ir::{
    AnnotationStub, AnonymousStructNames, CType, ClassKind, ClassStub, Classifier, ConstantStub,
    ConstantValue, ConstructorStub, EnumId, Field, FunctionDecl, FunctionParameterStub,
    FunctionStub, GlobalDecl, IndexError, ObjCCategory, ObjCClassId, ObjCMethod, ObjCProtocolId,
    PropertyAccessor, PropertyKind, PropertyStub, RecordKind, Stub, StubContainer, StubFlags,
    StubType, StructId, TypeAliasStub, TypeParamKey, TypeParameterStub, TypedefId,
    WrappedMacroDef,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::{StubIrContext, UnsupportedPolicy};
use crate::cspell::CSpeller;
use crate::mangle::{bridge_symbol, InteropMangler, MangleTarget};

pub(crate) use types::resolve;
use types::{Marshal, Position, Unsupported};

/// Calling convention id of variadic functions, called through their address.
pub const FFI_VARIADIC: &str = "ffi-variadic";

// ── Results ────────────────────────────────────────────────────────

/// A declaration left out of the bindings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuilderDiagnostic {
    pub declaration: String,
    pub reason: String,
}

impl fmt::Display for BuilderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped `{}`: {}", self.declaration, self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid native index: {0}")]
    Index(#[from] IndexError),
    #[error("cannot bind `{declaration}`: {reason}")]
    UnsupportedDeclaration { declaration: String, reason: String },
}

/// Naming tables produced while building.
#[derive(Debug, Default)]
pub struct BindingTables {
    pub anonymous_structs: AnonymousStructNames,
    /// Struct spellings taken by a typedef of the same name.
    pub forbidden_struct_names: BTreeSet<String>,
}

/// Receiver of an Objective-C message send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageReceiver {
    /// The first glue parameter, `self`.
    Instance,
    /// A class method on the named class.
    Class(String),
}

/// What one glue function does.
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeTarget {
    Call {
        function: String,
        return_type: CType,
        parameters: Vec<CType>,
    },
    /// Returns the function's address; the host calls it with libffi.
    VariadicAddress { function: String },
    GlobalGet { name: String, ty: CType },
    GlobalSet { name: String, ty: CType },
    /// Address of a global struct, or of the first element of a global array.
    GlobalAddress { name: String, decays: bool },
    MacroGet { name: String, ty: CType },
    MessageSend {
        receiver: MessageReceiver,
        selector: String,
        return_type: CType,
        parameters: Vec<CType>,
    },
}

/// Glue the bridge builder must emit for one stub.
#[derive(Clone, Debug, PartialEq)]
pub struct BridgeRequest {
    pub symbol: String,
    /// Name of the originating declaration, for diagnostics.
    pub declaration: String,
    pub target: BridgeTarget,
}

#[derive(Debug)]
pub struct StubIrBuilderResult {
    pub root: StubContainer,
    pub tables: BindingTables,
    pub diagnostics: Vec<BuilderDiagnostic>,
    /// Placeholders in the reserved packages this library references.
    pub forward_declarations: BTreeSet<Classifier>,
    pub bridge_requests: Vec<BridgeRequest>,
}

impl StubIrBuilderResult {
    /// Dotted names of the forward declarations, sorted.
    pub fn forward_declaration_names(&self) -> Vec<String> {
        self.forward_declarations
            .iter()
            .map(Classifier::fq_name)
            .collect()
    }
}

// ── Builder ────────────────────────────────────────────────────────

pub struct StubIrBuilder<'a> {
    ctx: StubIrContext<'a>,
    speller: CSpeller<'a>,
    mangler: InteropMangler,
    typedef_names: FxHashSet<&'a str>,
    tables: BindingTables,
    forward: BTreeSet<Classifier>,
    /// Placeholders referenced by the declaration being built.
    pending_forward: Vec<Classifier>,
    requests: Vec<BridgeRequest>,
    diagnostics: Vec<BuilderDiagnostic>,
}

impl<'a> StubIrBuilder<'a> {
    pub fn new(ctx: StubIrContext<'a>) -> Self {
        StubIrBuilder {
            ctx,
            speller: CSpeller::new(ctx.index),
            mangler: InteropMangler::new(),
            typedef_names: ctx.index.typedef_names(),
            tables: BindingTables::default(),
            forward: BTreeSet::new(),
            pending_forward: Vec::new(),
            requests: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(package = %self.ctx.package()))]
    pub fn build(mut self) -> Result<StubIrBuilderResult, BuildError> {
        let index = self.ctx.index;
        index.validate()?;

        let mut root = StubContainer::new(self.ctx.package());

        for id in index.struct_ids() {
            let label = self.struct_label(id);
            self.bind_into(&mut root.children, &label, |b| b.build_struct(id))?;
        }
        for id in index.enum_ids() {
            let label = index.enum_def(id).spelling.clone();
            self.bind_into(&mut root.children, &label, |b| b.build_enum(id))?;
        }
        for id in index.typedef_ids() {
            let label = index.typedef(id).name.clone();
            self.bind_into(&mut root.children, &label, |b| b.build_typedef(id))?;
        }
        for id in index.objc_protocol_ids() {
            let label = index.objc_protocol(id).name.clone();
            self.bind_into(&mut root.children, &label, |b| b.build_objc_protocol(id))?;
        }

        // Categories of classes bound here become members; the rest become
        // extension containers.
        let mut merged: FxHashMap<ObjCClassId, Vec<&ObjCCategory>> = FxHashMap::default();
        let mut extensions = Vec::new();
        for category in &index.objc_categories {
            if self.binds_class(category.class) {
                merged.entry(category.class).or_default().push(category);
            } else {
                extensions.push(category);
            }
        }
        for id in index.objc_class_ids() {
            let label = index.objc_class(id).name.clone();
            let categories = merged.remove(&id).unwrap_or_default();
            self.bind_into(&mut root.children, &label, |b| {
                b.build_objc_class(id, &categories)
            })?;
        }
        for category in extensions {
            let label = format!("{}+{}", index.objc_class(category.class).name, category.name);
            self.bind_into(&mut root.children, &label, |b| b.build_category(category))?;
        }

        for f in &index.functions {
            self.bind_into(&mut root.children, &f.name, |b| b.build_function(f))?;
        }
        for g in &index.globals {
            self.bind_into(&mut root.children, &g.name, |b| b.build_global(g))?;
        }
        for c in &index.constants {
            self.bind_into(&mut root.children, &c.name, |b| b.build_constant(&c.name, &c.value))?;
        }
        for m in &index.wrapped_macros {
            self.bind_into(&mut root.children, &m.name, |b| b.build_wrapped_macro(m))?;
        }

        tracing::debug!(
            stubs = root.children.len(),
            bridges = self.requests.len(),
            skipped = self.diagnostics.len(),
            forward = self.forward.len(),
            "built stub IR"
        );

        Ok(StubIrBuilderResult {
            root,
            tables: self.tables,
            diagnostics: self.diagnostics,
            forward_declarations: self.forward,
            bridge_requests: self.requests,
        })
    }

    // ── Policy ─────────────────────────────────────────────────────

    /// Build one top-level declaration, rolling back its side effects if it
    /// turns out to be unsupported.
    fn bind_into(
        &mut self,
        out: &mut Vec<Stub>,
        declaration: &str,
        f: impl FnOnce(&mut Self) -> Result<Vec<Stub>, Unsupported>,
    ) -> Result<(), BuildError> {
        match self.attempt(f) {
            Ok(stubs) => {
                self.forward.extend(self.pending_forward.drain(..));
                out.extend(stubs);
                Ok(())
            }
            Err(reason) => self.reject(declaration, reason),
        }
    }

    /// Build one member. `Ok(None)` means it was skipped.
    fn member<T>(
        &mut self,
        declaration: &str,
        f: impl FnOnce(&mut Self) -> Result<T, Unsupported>,
    ) -> Result<Option<T>, Unsupported> {
        let forward_mark = self.pending_forward.len();
        let request_mark = self.requests.len();
        match f(self) {
            Ok(v) => Ok(Some(v)),
            Err(reason) => {
                self.pending_forward.truncate(forward_mark);
                self.requests.truncate(request_mark);
                match self.ctx.config.policy {
                    UnsupportedPolicy::Skip => {
                        self.report(declaration, &reason);
                        Ok(None)
                    }
                    UnsupportedPolicy::Abort => Err(reason),
                }
            }
        }
    }

    fn attempt<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Unsupported>,
    ) -> Result<T, Unsupported> {
        self.pending_forward.clear();
        let request_mark = self.requests.len();
        let result = f(self);
        if result.is_err() {
            self.pending_forward.clear();
            self.requests.truncate(request_mark);
        }
        result
    }

    fn reject(&mut self, declaration: &str, reason: Unsupported) -> Result<(), BuildError> {
        match self.ctx.config.policy {
            UnsupportedPolicy::Skip => {
                self.report(declaration, &reason);
                Ok(())
            }
            UnsupportedPolicy::Abort => Err(BuildError::UnsupportedDeclaration {
                declaration: declaration.to_owned(),
                reason: reason.0,
            }),
        }
    }

    fn report(&mut self, declaration: &str, reason: &Unsupported) {
        tracing::debug!(declaration, %reason, "skipping unsupported declaration");
        self.diagnostics.push(BuilderDiagnostic {
            declaration: declaration.to_owned(),
            reason: reason.0.clone(),
        });
    }

    fn request(&mut self, symbol: &str, declaration: &str, target: BridgeTarget) {
        self.requests.push(BridgeRequest {
            symbol: symbol.to_owned(),
            declaration: declaration.to_owned(),
            target,
        });
    }

    fn binds_class(&self, id: ObjCClassId) -> bool {
        let class = self.ctx.index.objc_class(id);
        !class.is_forward && self.ctx.config.imported_package(&class.name).is_none()
    }

    fn struct_label(&self, id: StructId) -> String {
        let decl = self.ctx.index.struct_decl(id);
        if decl.is_anonymous {
            format!("<anonymous {} #{}>", decl.kind.keyword(), id.raw())
        } else {
            format!("{} {}", decl.kind.keyword(), decl.spelling)
        }
    }

    // ── Structs ────────────────────────────────────────────────────

    fn build_struct(&mut self, id: StructId) -> Result<Vec<Stub>, Unsupported> {
        let index = self.ctx.index;
        let decl = index.struct_decl(id);
        if !decl.is_anonymous && self.ctx.config.imported_package(&decl.spelling).is_some() {
            return Ok(Vec::new());
        }
        let Some(def) = &decl.def else {
            if !decl.is_anonymous {
                // Records the placeholder even when nothing references it.
                self.struct_ref(id);
            }
            return Ok(Vec::new());
        };

        let classifier = Classifier::new(self.ctx.package(), self.struct_name(id));
        let spelling = self
            .speller
            .record_spelling(id)
            .unwrap_or_else(|| classifier.relative_name().to_owned());

        let mut members = vec![Stub::Constructor(ConstructorStub {
            parameters: vec![FunctionParameterStub::new(
                "rawPtr",
                StubType::wrapper(Classifier::runtime("NativePtr"), Vec::new()),
            )],
            flags: StubFlags::PUBLIC,
            annotations: Vec::new(),
        })];
        for field in &def.fields {
            let label = format!("{}.{}", classifier.relative_name(), field.name);
            if let Some(property) = self.member(&label, |b| b.build_field(&classifier, field))? {
                members.push(Stub::Property(property));
            }
        }

        let kind = match decl.kind {
            RecordKind::Struct => ClassKind::Struct,
            RecordKind::Union => ClassKind::Union,
        };
        let mangled_name = self.mangler.mangle(&MangleTarget::Struct(&classifier));
        Ok(vec![Stub::Class(ClassStub {
            classifier,
            kind,
            flags: StubFlags::PUBLIC | StubFlags::FINAL,
            annotations: vec![AnnotationStub::CStruct { spelling }],
            supertypes: vec![StubType::wrapper(
                Classifier::runtime("CStructVar"),
                Vec::new(),
            )],
            type_parameters: Vec::new(),
            members,
            mangled_name,
        })])
    }

    fn build_field(&mut self, owner: &Classifier, field: &Field) -> Result<PropertyStub, Unsupported> {
        if field.name.is_empty() {
            return Err(Unsupported::new("anonymous member"));
        }
        let mangled_name = self.mangler.mangle(&MangleTarget::Field {
            owner,
            name: &field.name,
        });
        let byte_offset = field.offset / 8;
        let mapped = self.map_type(&field.ty, Position::Field)?;

        let kind = if let Some(width) = field.bit_width {
            let index = self.ctx.index;
            let signed = match resolve(index, &field.ty) {
                CType::Int { signed, .. } => *signed,
                CType::Enum(e) => matches!(
                    resolve(index, &index.enum_def(*e).base_type),
                    CType::Int { signed: true, .. }
                ),
                _ => false,
            };
            PropertyKind::Var {
                getter: PropertyAccessor::getter(
                    StubFlags::PUBLIC,
                    vec![AnnotationStub::ReadBits {
                        offset: field.offset,
                        size: width,
                        signed,
                    }],
                ),
                setter: PropertyAccessor::setter(
                    mapped.ty.clone(),
                    StubFlags::PUBLIC,
                    vec![AnnotationStub::WriteBits {
                        offset: field.offset,
                        size: width,
                    }],
                ),
            }
        } else if mapped.marshal == Marshal::ByValue
            || matches!(
                resolve(self.ctx.index, &field.ty),
                CType::ConstArray { .. } | CType::IncompleteArray(_)
            )
        {
            // Nested records and arrays are addressed in place.
            PropertyKind::Val {
                getter: PropertyAccessor::getter(
                    StubFlags::PUBLIC,
                    vec![AnnotationStub::GetMemberAt {
                        offset: byte_offset,
                        by_value: false,
                    }],
                ),
            }
        } else {
            PropertyKind::Var {
                getter: PropertyAccessor::getter(
                    StubFlags::PUBLIC,
                    vec![AnnotationStub::GetMemberAt {
                        offset: byte_offset,
                        by_value: true,
                    }],
                ),
                setter: PropertyAccessor::setter(
                    mapped.ty.clone(),
                    StubFlags::PUBLIC,
                    vec![AnnotationStub::SetMemberAt {
                        offset: byte_offset,
                    }],
                ),
            }
        };

        Ok(PropertyStub {
            name: field.name.clone(),
            ty: mapped.ty,
            kind,
            receiver: None,
            flags: StubFlags::PUBLIC | StubFlags::FINAL,
            annotations: Vec::new(),
            mangled_name,
        })
    }

    // ── Enums and typedefs ─────────────────────────────────────────

    fn build_enum(&mut self, id: EnumId) -> Result<Vec<Stub>, Unsupported> {
        let index = self.ctx.index;
        let e = index.enum_def(id);
        if !e.is_anonymous && self.ctx.config.imported_package(&e.spelling).is_some() {
            return Ok(Vec::new());
        }
        let base = self.map_type(&e.base_type, Position::Field)?.ty;

        let mut out = Vec::with_capacity(e.constants.len() + 1);
        let constant_type = if e.is_anonymous {
            base
        } else {
            let alias = Classifier::new(self.ctx.package(), e.spelling.clone());
            out.push(Stub::TypeAlias(TypeAliasStub {
                mangled_name: self.mangler.mangle(&MangleTarget::Enum(&alias)),
                alias: alias.clone(),
                aliasee: base.clone(),
                flags: StubFlags::PUBLIC,
                annotations: Vec::new(),
            }));
            StubType::Abbreviation {
                alias,
                expanded: Box::new(base),
                nullable: false,
            }
        };

        for constant in &e.constants {
            out.push(Stub::Property(PropertyStub {
                name: constant.name.clone(),
                ty: constant_type.clone(),
                kind: PropertyKind::Constant {
                    value: ConstantStub::Integer(constant.value),
                },
                receiver: None,
                flags: StubFlags::PUBLIC | StubFlags::CONST | StubFlags::FINAL,
                annotations: Vec::new(),
                mangled_name: self
                    .mangler
                    .mangle(&MangleTarget::EnumConstant(&constant.name)),
            }));
        }
        Ok(out)
    }

    fn build_typedef(&mut self, id: TypedefId) -> Result<Vec<Stub>, Unsupported> {
        let index = self.ctx.index;
        let typedef = index.typedef(id);
        if self.ctx.config.imported_package(&typedef.name).is_some() {
            return Ok(Vec::new());
        }
        // `typedef enum E E;` names the alias the enum already declares.
        if let CType::Enum(e) = typedef.aliased.unqualified() {
            let e = index.enum_def(*e);
            if !e.is_anonymous && e.spelling == typedef.name {
                return Ok(Vec::new());
            }
        }
        let aliasee = self.map_type(&typedef.aliased, Position::Alias)?.ty;
        let alias = Classifier::new(self.ctx.package(), typedef.name.clone());
        Ok(vec![Stub::TypeAlias(TypeAliasStub {
            mangled_name: self.mangler.mangle(&MangleTarget::Typedef(&alias)),
            alias,
            aliasee,
            flags: StubFlags::PUBLIC,
            annotations: Vec::new(),
        })])
    }

    // ── Functions ──────────────────────────────────────────────────

    fn build_function(&mut self, f: &FunctionDecl) -> Result<Vec<Stub>, Unsupported> {
        let mut parameters = self.parameters(
            f.parameters
                .iter()
                .map(|p| (p.name.as_deref(), &p.ty, p.ns_consumed)),
        )?;
        let ret = self.map_type(&f.return_type, Position::Return)?;

        let mut flags = StubFlags::PUBLIC_EXTERNAL;
        if f.is_variadic {
            flags |= StubFlags::VARARG;
            parameters.push(FunctionParameterStub {
                name: "variadicArguments".to_owned(),
                ty: StubType::builtin("Any").with_nullable(true),
                is_vararg: true,
                annotations: Vec::new(),
            });
        }

        let parameter_types: Vec<StubType> = parameters.iter().map(|p| p.ty.clone()).collect();
        let mangled_name = self.mangler.mangle(&MangleTarget::Function {
            name: &f.name,
            parameters: &parameter_types,
        });
        let symbol = bridge_symbol(&mangled_name);

        let mut annotations = vec![AnnotationStub::CCall { id: symbol.clone() }];
        if ret.marshal == Marshal::ByValue {
            annotations.push(AnnotationStub::CValue);
        }
        if f.is_variadic {
            annotations.push(AnnotationStub::CallingConvention {
                id: FFI_VARIADIC.to_owned(),
            });
            self.request(
                &symbol,
                &f.name,
                BridgeTarget::VariadicAddress {
                    function: f.name.clone(),
                },
            );
        } else {
            self.request(
                &symbol,
                &f.name,
                BridgeTarget::Call {
                    function: f.name.clone(),
                    return_type: f.return_type.clone(),
                    parameters: f.parameters.iter().map(|p| p.ty.clone()).collect(),
                },
            );
        }

        Ok(vec![Stub::Function(FunctionStub {
            name: f.name.clone(),
            return_type: ret.ty,
            parameters,
            type_parameters: Vec::new(),
            receiver: None,
            flags,
            annotations,
            mangled_name,
        })])
    }

    /// Host parameters with marshaling annotations. Missing or repeated
    /// names become `argN`.
    fn parameters<'p>(
        &mut self,
        params: impl Iterator<Item = (Option<&'p str>, &'p CType, bool)>,
    ) -> Result<Vec<FunctionParameterStub>, Unsupported> {
        let mut used = FxHashSet::default();
        let mut out = Vec::new();
        for (i, (name, ty, consumed)) in params.enumerate() {
            let mapped = self.map_type(ty, Position::Parameter)?;
            let mut name = match name {
                Some(n) if !n.is_empty() => n.to_owned(),
                _ => format!("arg{i}"),
            };
            if !used.insert(name.clone()) {
                name = format!("{name}{i}");
                used.insert(name.clone());
            }
            let mut param = FunctionParameterStub::new(name, mapped.ty);
            match mapped.marshal {
                Marshal::CString => param.annotations.push(AnnotationStub::CString),
                Marshal::WCString => param.annotations.push(AnnotationStub::WCString),
                Marshal::ByValue => param.annotations.push(AnnotationStub::CValue),
                Marshal::Plain => {}
            }
            if consumed {
                param.annotations.push(AnnotationStub::Consumed);
            }
            out.push(param);
        }
        Ok(out)
    }

    // ── Globals and macros ─────────────────────────────────────────

    fn build_global(&mut self, g: &GlobalDecl) -> Result<Vec<Stub>, Unsupported> {
        let mangled_name = self.mangler.mangle(&MangleTarget::Global(&g.name));
        let getter_symbol = bridge_symbol(&self.mangler.accessor(&mangled_name, false));
        let mapped = self.map_type(&g.ty, Position::Global)?;
        let resolved = resolve(self.ctx.index, &g.ty);

        let in_place = matches!(
            resolved,
            CType::Record(_) | CType::ConstArray { .. } | CType::IncompleteArray(_)
        );
        let getter = PropertyAccessor::getter(
            StubFlags::PUBLIC_EXTERNAL,
            vec![AnnotationStub::CCall {
                id: getter_symbol.clone(),
            }],
        );

        let kind = if in_place {
            self.request(
                &getter_symbol,
                &g.name,
                BridgeTarget::GlobalAddress {
                    name: g.name.clone(),
                    decays: !matches!(resolved, CType::Record(_)),
                },
            );
            PropertyKind::Val { getter }
        } else {
            self.request(
                &getter_symbol,
                &g.name,
                BridgeTarget::GlobalGet {
                    name: g.name.clone(),
                    ty: g.ty.clone(),
                },
            );
            if g.is_const || matches!(g.ty, CType::Const(_)) {
                PropertyKind::Val { getter }
            } else {
                let setter_symbol = bridge_symbol(&self.mangler.accessor(&mangled_name, true));
                self.request(
                    &setter_symbol,
                    &g.name,
                    BridgeTarget::GlobalSet {
                        name: g.name.clone(),
                        ty: g.ty.clone(),
                    },
                );
                PropertyKind::Var {
                    getter,
                    setter: PropertyAccessor::setter(
                        mapped.ty.clone(),
                        StubFlags::PUBLIC_EXTERNAL,
                        vec![AnnotationStub::CCall { id: setter_symbol }],
                    ),
                }
            }
        };

        Ok(vec![Stub::Property(PropertyStub {
            name: g.name.clone(),
            ty: mapped.ty,
            kind,
            receiver: None,
            flags: StubFlags::PUBLIC,
            annotations: Vec::new(),
            mangled_name,
        })])
    }

    fn build_constant(
        &mut self,
        name: &str,
        value: &ConstantValue,
    ) -> Result<Vec<Stub>, Unsupported> {
        let (ty, value) = match value {
            ConstantValue::Integer { value, ty } => {
                if !matches!(
                    resolve(self.ctx.index, ty),
                    CType::Int { .. } | CType::Bool | CType::Enum(_)
                ) {
                    return Err(Unsupported::new("integer constant of non-integer type"));
                }
                (
                    self.map_type(ty, Position::Field)?.ty,
                    ConstantStub::Integer(*value),
                )
            }
            ConstantValue::FloatingPoint { value, ty } => {
                if !matches!(resolve(self.ctx.index, ty), CType::Float { .. }) {
                    return Err(Unsupported::new("floating constant of non-floating type"));
                }
                (
                    self.map_type(ty, Position::Field)?.ty,
                    ConstantStub::double(*value),
                )
            }
            ConstantValue::String(s) => (StubType::builtin("String"), ConstantStub::String(s.clone())),
        };
        Ok(vec![Stub::Property(PropertyStub {
            name: name.to_owned(),
            ty,
            kind: PropertyKind::Constant { value },
            receiver: None,
            flags: StubFlags::PUBLIC | StubFlags::CONST | StubFlags::FINAL,
            annotations: Vec::new(),
            mangled_name: self.mangler.mangle(&MangleTarget::Macro(name)),
        })])
    }

    fn build_wrapped_macro(&mut self, m: &WrappedMacroDef) -> Result<Vec<Stub>, Unsupported> {
        let mapped = self.map_type(&m.ty, Position::Return)?;
        if mapped.marshal == Marshal::ByValue {
            return Err(Unsupported::new("struct-valued macro"));
        }
        if matches!(resolve(self.ctx.index, &m.ty), CType::Void) {
            return Err(Unsupported::new("macro without a value"));
        }
        let mangled_name = self.mangler.mangle(&MangleTarget::Macro(&m.name));
        let symbol = bridge_symbol(&self.mangler.accessor(&mangled_name, false));
        self.request(
            &symbol,
            &m.name,
            BridgeTarget::MacroGet {
                name: m.name.clone(),
                ty: m.ty.clone(),
            },
        );
        Ok(vec![Stub::Property(PropertyStub {
            name: m.name.clone(),
            ty: mapped.ty,
            kind: PropertyKind::Val {
                getter: PropertyAccessor::getter(
                    StubFlags::PUBLIC_EXTERNAL,
                    vec![AnnotationStub::CCall { id: symbol }],
                ),
            },
            receiver: None,
            flags: StubFlags::PUBLIC,
            annotations: Vec::new(),
            mangled_name,
        })])
    }

    // ── Objective-C ────────────────────────────────────────────────

    fn build_objc_protocol(&mut self, id: ObjCProtocolId) -> Result<Vec<Stub>, Unsupported> {
        let index = self.ctx.index;
        let protocol = index.objc_protocol(id);
        if self.ctx.config.imported_package(&protocol.name).is_some() {
            return Ok(Vec::new());
        }
        if protocol.is_forward {
            self.objc_protocol_ref(id);
            return Ok(Vec::new());
        }

        let classifier = Classifier::new(self.ctx.package(), self.protocol_name(id));
        let mut supertypes: Vec<StubType> = protocol
            .protocols
            .iter()
            .map(|p| StubType::classifier(self.objc_protocol_ref(*p)))
            .collect();
        if supertypes.is_empty() {
            supertypes.push(StubType::wrapper(Classifier::runtime("ObjCObject"), Vec::new()));
        }

        let mut members = Vec::new();
        for method in &protocol.methods {
            let label = format!("{}.{}", protocol.name, method.selector);
            if method.is_class {
                self.member(&label, |_| {
                    Err::<(), _>(Unsupported::new("class method in a protocol"))
                })?;
                continue;
            }
            if let Some(f) =
                self.member(&label, |b| b.build_method(&classifier, method, None, None))?
            {
                members.push(Stub::Function(f));
            }
        }

        Ok(vec![Stub::Class(ClassStub {
            mangled_name: self.mangler.mangle(&MangleTarget::ObjCProtocol(&classifier)),
            classifier,
            kind: ClassKind::ObjCProtocol,
            flags: StubFlags::PUBLIC,
            annotations: vec![AnnotationStub::ExternalObjCClass],
            supertypes,
            type_parameters: Vec::new(),
            members,
        })])
    }

    fn build_objc_class(
        &mut self,
        id: ObjCClassId,
        categories: &[&ObjCCategory],
    ) -> Result<Vec<Stub>, Unsupported> {
        let index = self.ctx.index;
        let class = index.objc_class(id);
        if self.ctx.config.imported_package(&class.name).is_some() {
            return Ok(Vec::new());
        }
        if class.is_forward {
            self.objc_class_ref(id);
            return Ok(Vec::new());
        }

        let classifier = Classifier::new(self.ctx.package(), class.name.clone());
        let mut supertypes = vec![match class.base_class {
            Some(base) => StubType::classifier(self.objc_class_ref(base)),
            None => StubType::wrapper(Classifier::runtime("ObjCObjectBase"), Vec::new()),
        }];
        for p in &class.protocols {
            supertypes.push(StubType::classifier(self.objc_protocol_ref(*p)));
        }
        let type_parameters = class
            .type_parameters
            .iter()
            .map(|name| TypeParameterStub {
                key: TypeParamKey::new(classifier.fq_name(), name.clone()),
                upper_bound: Some(StubType::builtin("Any").with_nullable(true)),
            })
            .collect();

        let methods = class
            .methods
            .iter()
            .chain(categories.iter().flat_map(|c| c.methods.iter()));
        let mut members = Vec::new();
        let mut class_methods = Vec::new();
        for method in methods {
            let label = format!("{}.{}", class.name, method.selector);
            let receiver_class = method.is_class.then_some(class.name.as_str());
            if let Some(f) = self.member(&label, |b| {
                b.build_method(&classifier, method, None, receiver_class)
            })? {
                if method.is_class {
                    class_methods.push(Stub::Function(f));
                } else {
                    members.push(Stub::Function(f));
                }
            }
        }
        if !class_methods.is_empty() {
            let companion = classifier.nested("Companion");
            members.push(Stub::Class(ClassStub {
                mangled_name: self.mangler.mangle(&MangleTarget::ObjCClass(&companion)),
                classifier: companion,
                kind: ClassKind::ObjCClass,
                flags: StubFlags::PUBLIC | StubFlags::FINAL,
                annotations: Vec::new(),
                supertypes: Vec::new(),
                type_parameters: Vec::new(),
                members: class_methods,
            }));
        }

        Ok(vec![Stub::Class(ClassStub {
            mangled_name: self.mangler.mangle(&MangleTarget::ObjCClass(&classifier)),
            classifier,
            kind: ClassKind::ObjCClass,
            flags: StubFlags::PUBLIC,
            annotations: vec![AnnotationStub::ExternalObjCClass],
            supertypes,
            type_parameters,
            members,
        })])
    }

    /// Category of a class bound elsewhere: extension functions on it.
    fn build_category(&mut self, category: &ObjCCategory) -> Result<Vec<Stub>, Unsupported> {
        let index = self.ctx.index;
        let class_name = &index.objc_class(category.class).name;
        let owner = self.objc_class_ref(category.class);
        let receiver = StubType::classifier(owner.clone());

        let mut container = StubContainer::new(format!("{class_name}+{}", category.name));
        for method in &category.methods {
            let label = format!("{class_name}+{}.{}", category.name, method.selector);
            if method.is_class {
                self.member(&label, |_| {
                    Err::<(), _>(Unsupported::new("class method in an extension category"))
                })?;
                continue;
            }
            if let Some(f) = self.member(&label, |b| {
                b.build_method(&owner, method, Some(receiver.clone()), None)
            })? {
                container.push(Stub::Function(f));
            }
        }
        Ok(vec![Stub::Container(container)])
    }

    /// One Objective-C method. `class_receiver` names the class for class
    /// methods; instance methods send to the glue's `self` parameter.
    fn build_method(
        &mut self,
        owner: &Classifier,
        method: &ObjCMethod,
        receiver: Option<StubType>,
        class_receiver: Option<&str>,
    ) -> Result<FunctionStub, Unsupported> {
        if method.is_variadic {
            return Err(Unsupported::new("variadic Objective-C method"));
        }
        let parameters = self.parameters(
            method
                .parameters
                .iter()
                .map(|p| (p.name.as_deref(), &p.ty, p.ns_consumed)),
        )?;
        let ret = self.map_type(&method.return_type, Position::Return)?;

        let parameter_types: Vec<StubType> = parameters.iter().map(|p| p.ty.clone()).collect();
        let mangled_name = self.mangler.mangle(&MangleTarget::ObjCMethod {
            owner,
            selector: &method.selector,
            is_class: method.is_class,
            parameters: &parameter_types,
        });
        let symbol = bridge_symbol(&mangled_name);

        let mut annotations = vec![
            AnnotationStub::ObjCMethod {
                selector: method.selector.clone(),
                encoding: method.encoding.clone(),
                is_variadic: method.is_variadic,
            },
            AnnotationStub::CCall { id: symbol.clone() },
        ];
        if ret.marshal == Marshal::ByValue {
            annotations.push(AnnotationStub::CValue);
        }
        if method.ns_returns_retained {
            annotations.push(AnnotationStub::ReturnsRetained);
        }
        if method.ns_consumes_self {
            annotations.push(AnnotationStub::ConsumesReceiver);
        }

        let declaration = format!("{}.{}", owner.relative_name(), method.selector);
        self.request(
            &symbol,
            &declaration,
            BridgeTarget::MessageSend {
                receiver: class_receiver.map_or(MessageReceiver::Instance, |c| {
                    MessageReceiver::Class(c.to_owned())
                }),
                selector: method.selector.clone(),
                return_type: method.return_type.clone(),
                parameters: method.parameters.iter().map(|p| p.ty.clone()).collect(),
            },
        );

        let name = method
            .selector
            .split(':')
            .next()
            .unwrap_or(&method.selector)
            .to_owned();
        Ok(FunctionStub {
            name,
            return_type: ret.ty,
            parameters,
            type_parameters: Vec::new(),
            receiver,
            flags: StubFlags::PUBLIC_EXTERNAL,
            annotations,
            mangled_name,
        })
    }
}

#[cfg(test)]
mod tests;
