//! Foreign types → host types.
//!
//! | C type | Host type |
//! |--------|-----------|
//! | `int`, `double`, `_Bool` | `lang.Int`, `lang.Double`, `lang.Boolean` |
//! | `const char*` (parameter) | `lang.String?` + `CString` |
//! | `void*` | `cinterop.COpaquePointer?` |
//! | `T*` | `cinterop.CPointer<TVar>?` |
//! | `struct S` (by value) | `cinterop.CValue<pkg.S>` |
//! | `struct S` (forward) | `cnames.structs.S` |
//! | `enum E` | abbreviation `pkg.E` → base integer |
//! | `typedef T A` | abbreviation `pkg.A` → mapped `T` |
//! | `R (*)(P...)` | `cinterop.CPointer<cinterop.CFunction<P..., R>>?` |

use std::fmt;

use cinterop_ir::{
    CType, Classifier, EnumId, ForwardKind, FunctionType, NativeIndex, ObjCClassId,
    ObjCProtocolId, StructId, StubType, TypeArgument,
};

use super::StubIrBuilder;

/// Why a declaration (or member) has no projection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Unsupported(pub(crate) String);

impl Unsupported {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Unsupported(reason.into())
    }
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a type is used; decides marshaling and which types are legal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Position {
    Parameter,
    Return,
    Field,
    Global,
    Alias,
}

/// How a value crosses the native boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Marshal {
    Plain,
    CString,
    WCString,
    /// A struct value: `CValue` at call boundaries, the struct class itself
    /// for fields and globals.
    ByValue,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MappedType {
    pub(crate) ty: StubType,
    pub(crate) marshal: Marshal,
}

impl MappedType {
    fn plain(ty: StubType) -> Self {
        MappedType {
            ty,
            marshal: Marshal::Plain,
        }
    }
}

fn runtime(name: &str) -> StubType {
    StubType::wrapper(Classifier::runtime(name), Vec::new())
}

fn runtime_of(name: &str, arguments: Vec<StubType>) -> StubType {
    StubType::wrapper(
        Classifier::runtime(name),
        arguments.into_iter().map(TypeArgument::invariant).collect(),
    )
}

/// Host builtin for a C arithmetic type.
pub(crate) fn primitive_name(ty: &CType) -> Option<&'static str> {
    match ty {
        CType::Bool => Some("Boolean"),
        CType::Int { size, signed, .. } => match (size, signed) {
            (1, true) => Some("Byte"),
            (1, false) => Some("UByte"),
            (2, true) => Some("Short"),
            (2, false) => Some("UShort"),
            (4, true) => Some("Int"),
            (4, false) => Some("UInt"),
            (8, true) => Some("Long"),
            (8, false) => Some("ULong"),
            _ => None,
        },
        CType::Float { size: 4, .. } => Some("Float"),
        CType::Float { size: 8, .. } => Some("Double"),
        _ => None,
    }
}

fn spelling_of(ty: &CType) -> String {
    match ty {
        CType::Int { spelling, .. } | CType::Float { spelling, .. } => spelling.clone(),
        CType::Unsupported(spelling) => spelling.clone(),
        other => format!("{other:?}"),
    }
}

/// `ty` with qualifiers and typedefs peeled off.
pub(crate) fn resolve<'t>(index: &'t NativeIndex, mut ty: &'t CType) -> &'t CType {
    loop {
        match ty.unqualified() {
            CType::Typedef(id) => ty = &index.typedef(*id).aliased,
            other => return other,
        }
    }
}

impl StubIrBuilder<'_> {
    pub(crate) fn map_type(
        &mut self,
        ty: &CType,
        position: Position,
    ) -> Result<MappedType, Unsupported> {
        match ty {
            CType::Void => match position {
                Position::Return | Position::Alias => Ok(MappedType::plain(StubType::unit())),
                _ => Err(Unsupported::new("`void` used as a value")),
            },
            CType::Bool | CType::Int { .. } | CType::Float { .. } => primitive_name(ty)
                .map(|name| MappedType::plain(StubType::builtin(name)))
                .ok_or_else(|| {
                    Unsupported::new(format!("`{}` has no host type", spelling_of(ty)))
                }),
            CType::Const(inner) => self.map_type(inner, position),
            CType::Pointer(_) if position == Position::Parameter && ty.is_c_string() => {
                Ok(MappedType {
                    ty: StubType::builtin("String").with_nullable(true),
                    marshal: Marshal::CString,
                })
            }
            CType::Pointer(_) if position == Position::Parameter && ty.is_wide_string() => {
                Ok(MappedType {
                    ty: StubType::builtin("String").with_nullable(true),
                    marshal: Marshal::WCString,
                })
            }
            CType::Pointer(pointee) => Ok(MappedType::plain(self.pointer_type(pointee)?)),
            CType::ConstArray { element, .. } | CType::IncompleteArray(element) => {
                match position {
                    Position::Parameter => Ok(MappedType::plain(self.pointer_type(element)?)),
                    Position::Field | Position::Global => Ok(MappedType::plain(
                        runtime_of("CPointer", vec![self.pointee_var(element)?]),
                    )),
                    Position::Return | Position::Alias => {
                        Err(Unsupported::new("array type outside a parameter or field"))
                    }
                }
            }
            CType::Record(id) => self.map_record(*id, position),
            CType::Enum(id) => self.map_enum(*id),
            CType::Typedef(id) => {
                let index = self.ctx.index;
                let typedef = index.typedef(*id);
                let inner = self.map_type(&typedef.aliased, position)?;
                if inner.marshal != Marshal::Plain
                    || matches!(typedef.aliased.unqualified(), CType::Void)
                {
                    return Ok(inner);
                }
                let package = self
                    .ctx
                    .config
                    .imported_package(&typedef.name)
                    .unwrap_or(self.ctx.package());
                let nullable = inner.ty.is_nullable();
                Ok(MappedType::plain(StubType::Abbreviation {
                    alias: Classifier::new(package, typedef.name.clone()),
                    expanded: Box::new(inner.ty),
                    nullable,
                }))
            }
            CType::FunctionPointer(f) => Ok(MappedType::plain(
                runtime_of("CPointer", vec![self.function_type(f)?]).with_nullable(true),
            )),
            CType::ObjCObjectPointer(id) => Ok(MappedType::plain(
                StubType::classifier(self.objc_class_ref(*id)).with_nullable(true),
            )),
            CType::ObjCId { protocols } => Ok(MappedType::plain(self.objc_id(protocols))),
            CType::Unsupported(spelling) => {
                Err(Unsupported::new(format!("unsupported type `{spelling}`")))
            }
        }
    }

    fn map_record(&mut self, id: StructId, position: Position) -> Result<MappedType, Unsupported> {
        let index = self.ctx.index;
        let decl = index.struct_decl(id);
        match position {
            Position::Alias => Ok(MappedType::plain(StubType::classifier(self.struct_ref(id)))),
            Position::Field | Position::Global => Ok(MappedType {
                ty: StubType::classifier(self.struct_ref(id)),
                marshal: Marshal::ByValue,
            }),
            Position::Parameter | Position::Return => {
                if !decl.is_defined() {
                    return Err(Unsupported::new(format!(
                        "incomplete struct `{}` passed by value",
                        decl.spelling
                    )));
                }
                if self.speller.record_spelling(id).is_none() {
                    return Err(Unsupported::new("anonymous struct passed by value"));
                }
                let class = StubType::classifier(self.struct_ref(id));
                Ok(MappedType {
                    ty: runtime_of("CValue", vec![class]),
                    marshal: Marshal::ByValue,
                })
            }
        }
    }

    fn map_enum(&mut self, id: EnumId) -> Result<MappedType, Unsupported> {
        let index = self.ctx.index;
        let e = index.enum_def(id);
        let base = self.map_type(&e.base_type, Position::Field)?.ty;
        if e.is_anonymous {
            return Ok(MappedType::plain(base));
        }
        let package = self
            .ctx
            .config
            .imported_package(&e.spelling)
            .unwrap_or(self.ctx.package());
        Ok(MappedType::plain(StubType::Abbreviation {
            alias: Classifier::new(package, e.spelling.clone()),
            expanded: Box::new(base),
            nullable: false,
        }))
    }

    /// `CPointer<TVar>?`, or `COpaquePointer?` for `void*`.
    fn pointer_type(&mut self, pointee: &CType) -> Result<StubType, Unsupported> {
        if matches!(pointee.unqualified(), CType::Void) {
            return Ok(runtime("COpaquePointer").with_nullable(true));
        }
        Ok(runtime_of("CPointer", vec![self.pointee_var(pointee)?]).with_nullable(true))
    }

    /// The lvalue type pointed to by a `T*`.
    fn pointee_var(&mut self, ty: &CType) -> Result<StubType, Unsupported> {
        match ty.unqualified() {
            prim @ (CType::Bool | CType::Int { .. } | CType::Float { .. }) => primitive_name(prim)
                .map(|name| runtime(&format!("{name}Var")))
                .ok_or_else(|| {
                    Unsupported::new(format!("`{}` has no host type", spelling_of(prim)))
                }),
            CType::Void => Err(Unsupported::new("`void` element type")),
            CType::Pointer(inner) => {
                if matches!(inner.unqualified(), CType::Void) {
                    Ok(runtime("COpaquePointerVar"))
                } else {
                    Ok(runtime_of("CPointerVar", vec![self.pointee_var(inner)?]))
                }
            }
            CType::ConstArray { element, .. } | CType::IncompleteArray(element) => {
                self.pointee_var(element)
            }
            CType::Record(id) => Ok(StubType::classifier(self.struct_ref(*id))),
            CType::Enum(id) => {
                let index = self.ctx.index;
                self.pointee_var(&index.enum_def(*id).base_type)
            }
            CType::Typedef(id) => {
                let index = self.ctx.index;
                self.pointee_var(&index.typedef(*id).aliased)
            }
            CType::FunctionPointer(f) => Ok(runtime_of("CPointerVar", vec![self.function_type(f)?])),
            CType::ObjCObjectPointer(_) | CType::ObjCId { .. } => {
                let object = self.map_type(ty, Position::Field)?.ty;
                Ok(runtime_of("ObjCObjectVar", vec![object]))
            }
            CType::Const(inner) => self.pointee_var(inner),
            CType::Unsupported(spelling) => {
                Err(Unsupported::new(format!("unsupported type `{spelling}`")))
            }
        }
    }

    /// `CFunction<P..., R>`.
    fn function_type(&mut self, f: &FunctionType) -> Result<StubType, Unsupported> {
        if f.variadic {
            return Err(Unsupported::new("variadic function pointer"));
        }
        let mut arguments = f
            .parameters
            .iter()
            .map(|p| self.map_type(p, Position::Field).map(|m| m.ty))
            .collect::<Result<Vec<_>, _>>()?;
        arguments.push(self.map_type(&f.return_type, Position::Return)?.ty);
        Ok(runtime_of("CFunction", arguments))
    }

    fn objc_id(&mut self, protocols: &[ObjCProtocolId]) -> StubType {
        match protocols {
            [single] => StubType::classifier(self.objc_protocol_ref(*single)).with_nullable(true),
            _ => runtime("ObjCObject").with_nullable(true),
        }
    }

    // ── Naming ─────────────────────────────────────────────────────

    /// Host name of a struct: its spelling, `<spelling>Struct` when a typedef
    /// takes the plain name, or a minted `anonymousStructN`.
    pub(crate) fn struct_name(&mut self, id: StructId) -> String {
        let index = self.ctx.index;
        let decl = index.struct_decl(id);
        if decl.is_anonymous {
            return self.tables.anonymous_structs.name_for(id).to_owned();
        }
        if self.typedef_names.contains(decl.spelling.as_str()) {
            self.tables
                .forbidden_struct_names
                .insert(decl.spelling.clone());
            return format!("{}Struct", decl.spelling);
        }
        decl.spelling.clone()
    }

    /// Classifier a struct reference binds to. Undefined structs become
    /// `cnames.structs` placeholders and are recorded as forward declarations.
    pub(crate) fn struct_ref(&mut self, id: StructId) -> Classifier {
        let (index, config) = (self.ctx.index, self.ctx.config);
        let decl = index.struct_decl(id);
        if !decl.is_anonymous {
            if let Some(package) = config.imported_package(&decl.spelling) {
                return Classifier::new(package, self.struct_name(id));
            }
            if !decl.is_defined() {
                let placeholder = ForwardKind::CStruct.classifier(&decl.spelling);
                self.pending_forward.push(placeholder.clone());
                return placeholder;
            }
        }
        Classifier::new(self.ctx.package(), self.struct_name(id))
    }

    pub(crate) fn objc_class_ref(&mut self, id: ObjCClassId) -> Classifier {
        let (index, config) = (self.ctx.index, self.ctx.config);
        let class = index.objc_class(id);
        if let Some(package) = config.imported_package(&class.name) {
            return Classifier::new(package, class.name.clone());
        }
        if class.is_forward {
            let placeholder = ForwardKind::ObjCClass.classifier(&class.name);
            self.pending_forward.push(placeholder.clone());
            return placeholder;
        }
        Classifier::new(self.ctx.package(), class.name.clone())
    }

    pub(crate) fn objc_protocol_ref(&mut self, id: ObjCProtocolId) -> Classifier {
        let (index, config) = (self.ctx.index, self.ctx.config);
        let protocol = index.objc_protocol(id);
        if let Some(package) = config.imported_package(&protocol.name) {
            return Classifier::new(package, self.protocol_name(id));
        }
        if protocol.is_forward {
            let placeholder = ForwardKind::ObjCProtocol.classifier(&self.protocol_name(id));
            self.pending_forward.push(placeholder.clone());
            return placeholder;
        }
        Classifier::new(self.ctx.package(), self.protocol_name(id))
    }

    /// Protocols sharing a class's name get a `Protocol` suffix.
    pub(crate) fn protocol_name(&self, id: ObjCProtocolId) -> String {
        let name = &self.ctx.index.objc_protocol(id).name;
        if self.ctx.index.objc_classes.iter().any(|c| &c.name == name) {
            format!("{name}Protocol")
        } else {
            name.clone()
        }
    }
}
