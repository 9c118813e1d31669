use super::*;
use crate::context::InteropConfig;
use cinterop_ir::{
    EnumConstant, EnumDef, NativeIndex, ObjCClass, ObjCProtocol, Parameter, PropertyKind,
    StructDecl, StructDef, TypeArgument, TypedefDef,
};
use pretty_assertions::assert_eq;

// ── Fixtures ───────────────────────────────────────────────────────

fn int() -> CType {
    CType::int(4, true, "int")
}

fn c_string() -> CType {
    CType::pointer(CType::constant(CType::int(1, true, "char")))
}

fn param(name: &str, ty: CType) -> Parameter {
    Parameter {
        name: Some(name.to_owned()),
        ty,
        ns_consumed: false,
    }
}

fn function(name: &str, params: Vec<Parameter>, ret: CType) -> FunctionDecl {
    FunctionDecl {
        name: name.to_owned(),
        return_type: ret,
        parameters: params,
        is_variadic: false,
    }
}

fn forward_struct(spelling: &str) -> StructDecl {
    StructDecl {
        spelling: spelling.to_owned(),
        kind: RecordKind::Struct,
        is_anonymous: false,
        def: None,
    }
}

fn defined_struct(spelling: &str, fields: Vec<Field>) -> StructDecl {
    StructDecl {
        spelling: spelling.to_owned(),
        kind: RecordKind::Struct,
        is_anonymous: spelling.is_empty(),
        def: Some(StructDef {
            size: 8,
            align: 4,
            fields,
        }),
    }
}

fn field(name: &str, ty: CType, offset_bits: u64) -> Field {
    Field {
        name: name.to_owned(),
        ty,
        offset: offset_bits,
        bit_width: None,
    }
}

fn build_with(index: &NativeIndex, config: &InteropConfig) -> StubIrBuilderResult {
    StubIrBuilder::new(StubIrContext::new(index, config))
        .build()
        .unwrap()
}

fn build(index: &NativeIndex) -> StubIrBuilderResult {
    build_with(index, &InteropConfig::new("native"))
}

fn function_named<'r>(result: &'r StubIrBuilderResult, name: &str) -> &'r FunctionStub {
    result
        .root
        .functions()
        .into_iter()
        .find(|f| f.name == name)
        .unwrap()
}

fn class_named<'r>(result: &'r StubIrBuilderResult, name: &str) -> &'r ClassStub {
    result
        .root
        .children
        .iter()
        .find_map(|s| match s {
            Stub::Class(c) if c.classifier.relative_name() == name => Some(c),
            _ => None,
        })
        .unwrap()
}

fn property_named<'r>(stubs: &'r [Stub], name: &str) -> &'r PropertyStub {
    stubs
        .iter()
        .find_map(|s| match s {
            Stub::Property(p) if p.name == name => Some(p),
            _ => None,
        })
        .unwrap()
}

fn alias_named<'r>(result: &'r StubIrBuilderResult, name: &str) -> &'r TypeAliasStub {
    result
        .root
        .children
        .iter()
        .find_map(|s| match s {
            Stub::TypeAlias(t) if t.alias.relative_name() == name => Some(t),
            _ => None,
        })
        .unwrap()
}

// ── Functions ──────────────────────────────────────────────────────

#[test]
fn function_gets_ccall_matching_its_bridge_request() {
    let mut index = NativeIndex::default();
    index
        .functions
        .push(function("add", vec![param("a", int()), param("b", int())], int()));

    let result = build(&index);
    let add = function_named(&result, "add");

    assert_eq!(add.mangled_name, "kfun:#add(lang.Int;lang.Int)");
    assert_eq!(add.ccall_id(), Some(bridge_symbol(&add.mangled_name).as_str()));
    assert_eq!(add.flags, StubFlags::PUBLIC_EXTERNAL);
    assert_eq!(add.return_type, StubType::builtin("Int"));

    assert_eq!(result.bridge_requests.len(), 1);
    let request = &result.bridge_requests[0];
    assert_eq!(Some(request.symbol.as_str()), add.ccall_id());
    assert!(matches!(
        &request.target,
        BridgeTarget::Call { function, parameters, .. } if function == "add" && parameters.len() == 2
    ));
}

#[test]
fn c_string_parameter_is_marshaled() {
    let mut index = NativeIndex::default();
    index
        .functions
        .push(function("puts", vec![param("s", c_string())], int()));

    let result = build(&index);
    let puts = function_named(&result, "puts");
    assert_eq!(
        puts.parameters[0].ty,
        StubType::builtin("String").with_nullable(true)
    );
    assert_eq!(puts.parameters[0].annotations, vec![AnnotationStub::CString]);
}

#[test]
fn unnamed_and_duplicate_parameters_get_positional_names() {
    let mut index = NativeIndex::default();
    let unnamed = Parameter {
        name: None,
        ty: int(),
        ns_consumed: false,
    };
    index.functions.push(function(
        "f",
        vec![unnamed, param("x", int()), param("x", int())],
        CType::Void,
    ));

    let result = build(&index);
    let names: Vec<&str> = function_named(&result, "f")
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["arg0", "x", "x2"]);
}

#[test]
fn variadic_function_uses_address_accessor() {
    let mut index = NativeIndex::default();
    let mut printf = function("printf", vec![param("format", c_string())], int());
    printf.is_variadic = true;
    index.functions.push(printf);

    let result = build(&index);
    let f = function_named(&result, "printf");
    assert!(f.flags.contains(StubFlags::VARARG));
    assert!(f.parameters.last().unwrap().is_vararg);
    assert!(f.annotations.contains(&AnnotationStub::CallingConvention {
        id: FFI_VARIADIC.to_owned()
    }));
    assert_eq!(
        result.bridge_requests[0].target,
        BridgeTarget::VariadicAddress {
            function: "printf".to_owned()
        }
    );
}

#[test]
fn struct_by_value_parameter_uses_cvalue() {
    let mut index = NativeIndex::default();
    index
        .structs
        .push(defined_struct("Point", vec![field("x", int(), 0)]));
    index.functions.push(function(
        "length",
        vec![param("p", CType::Record(StructId::new(0)))],
        CType::Float {
            size: 8,
            spelling: "double".into(),
        },
    ));

    let result = build(&index);
    let length = function_named(&result, "length");
    assert_eq!(
        length.parameters[0].ty,
        StubType::wrapper(
            Classifier::runtime("CValue"),
            vec![TypeArgument::invariant(StubType::classifier(
                Classifier::new("native", "Point")
            ))]
        )
    );
    assert_eq!(length.parameters[0].annotations, vec![AnnotationStub::CValue]);
}

// ── Forward declarations ───────────────────────────────────────────

#[test]
fn opaque_struct_pointer_references_placeholder() {
    let mut index = NativeIndex::default();
    index.structs.push(forward_struct("Opaque"));
    let opaque_ptr = CType::pointer(CType::Record(StructId::new(0)));
    index
        .functions
        .push(function("use_opaque", vec![param("o", opaque_ptr)], CType::Void));

    let result = build(&index);
    let f = function_named(&result, "use_opaque");
    assert_eq!(f.parameters[0].ty.to_string(), "cinterop.CPointer<cnames.structs.Opaque>?");
    assert_eq!(f.return_type, StubType::unit());
    assert_eq!(
        result.forward_declaration_names(),
        vec!["cnames.structs.Opaque".to_owned()]
    );
    assert!(!result
        .root
        .children
        .iter()
        .any(|s| matches!(s, Stub::Class(_))));
}

#[test]
fn skipped_function_leaves_no_glue() {
    let mut index = NativeIndex::default();
    index.structs.push(forward_struct("Hidden"));
    index.functions.push(function(
        "bad",
        vec![
            param("h", CType::pointer(CType::Record(StructId::new(0)))),
            param("x", CType::Unsupported("__int128".into())),
        ],
        CType::Void,
    ));
    index.functions.push(function("good", Vec::new(), CType::Void));

    let result = build(&index);
    let names: Vec<&str> = result.root.functions().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["good"]);
    assert_eq!(result.bridge_requests.len(), 1);
    assert_eq!(result.bridge_requests[0].declaration, "good");
    assert_eq!(
        result.diagnostics,
        vec![BuilderDiagnostic {
            declaration: "bad".to_owned(),
            reason: "unsupported type `__int128`".to_owned(),
        }]
    );
    assert_eq!(
        result.diagnostics[0].to_string(),
        "skipped `bad`: unsupported type `__int128`"
    );
}

#[test]
fn abort_policy_fails_the_build() {
    let mut index = NativeIndex::default();
    index.functions.push(function(
        "bad",
        vec![param("x", CType::Unsupported("__int128".into()))],
        CType::Void,
    ));
    let config = InteropConfig {
        policy: UnsupportedPolicy::Abort,
        ..InteropConfig::new("native")
    };

    let err = StubIrBuilder::new(StubIrContext::new(&index, &config))
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot bind `bad`: unsupported type `__int128`"
    );
}

fn protocol_with_class_method() -> NativeIndex {
    let mut index = NativeIndex::default();
    index.language = cinterop_ir::Language::ObjC;
    index.objc_protocols.push(ObjCProtocol {
        name: "P".into(),
        is_forward: false,
        protocols: Vec::new(),
        methods: vec![
            method("make", true, CType::Void),
            method("run", false, CType::Void),
        ],
    });
    index
}

#[test]
fn protocol_class_method_is_skipped_under_skip_policy() {
    let result = build(&protocol_with_class_method());
    assert_eq!(
        result.diagnostics,
        vec![BuilderDiagnostic {
            declaration: "P.make".to_owned(),
            reason: "class method in a protocol".to_owned(),
        }]
    );
    assert_eq!(class_named(&result, "P").members.len(), 1);
}

#[test]
fn protocol_class_method_fails_the_build_under_abort_policy() {
    let config = InteropConfig {
        policy: UnsupportedPolicy::Abort,
        ..InteropConfig::new("native")
    };
    let err = StubIrBuilder::new(StubIrContext::new(&protocol_with_class_method(), &config))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::UnsupportedDeclaration { ref reason, .. } if reason == "class method in a protocol"
    ));
}

#[test]
fn category_class_method_fails_the_build_under_abort_policy() {
    let mut index = NativeIndex::default();
    index.language = cinterop_ir::Language::ObjC;
    index.objc_classes.push(ObjCClass {
        name: "NSString".into(),
        is_forward: true,
        base_class: None,
        protocols: Vec::new(),
        type_parameters: Vec::new(),
        methods: Vec::new(),
    });
    index.objc_categories.push(ObjCCategory {
        name: "Extras".into(),
        class: ObjCClassId::new(0),
        methods: vec![method("make", true, CType::Void)],
    });
    let config = InteropConfig {
        policy: UnsupportedPolicy::Abort,
        ..InteropConfig::new("native")
    };

    let err = StubIrBuilder::new(StubIrContext::new(&index, &config))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::UnsupportedDeclaration { ref reason, .. }
            if reason == "class method in an extension category"
    ));
}

#[test]
fn dangling_reference_is_an_index_error() {
    let mut index = NativeIndex::default();
    index.functions.push(function(
        "f",
        vec![param("p", CType::Record(StructId::new(3)))],
        CType::Void,
    ));
    let config = InteropConfig::new("native");
    let err = StubIrBuilder::new(StubIrContext::new(&index, &config))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::Index(_)));
}

// ── Naming ─────────────────────────────────────────────────────────

#[test]
fn struct_colliding_with_typedef_gets_suffix() {
    let mut index = NativeIndex::default();
    index
        .structs
        .push(defined_struct("Foo", vec![field("x", int(), 0)]));
    index.typedefs.push(TypedefDef {
        name: "Foo".into(),
        aliased: CType::Record(StructId::new(0)),
    });

    let result = build(&index);
    let class = class_named(&result, "FooStruct");
    assert_eq!(
        class.annotations,
        vec![AnnotationStub::CStruct {
            spelling: "struct Foo".into()
        }]
    );
    assert_eq!(
        alias_named(&result, "Foo").aliasee,
        StubType::classifier(Classifier::new("native", "FooStruct"))
    );
    assert!(result.tables.forbidden_struct_names.contains("Foo"));
}

#[test]
fn anonymous_structs_are_numbered_in_encounter_order() {
    let mut index = NativeIndex::default();
    index.structs.push(defined_struct("", vec![field("a", int(), 0)]));
    index.structs.push(defined_struct("", vec![field("b", int(), 0)]));

    let result = build(&index);
    class_named(&result, "anonymousStruct1");
    class_named(&result, "anonymousStruct2");
    let names: Vec<(u32, &str)> = result
        .tables
        .anonymous_structs
        .iter()
        .map(|(id, n)| (id.raw(), n))
        .collect();
    assert_eq!(names, vec![(0, "anonymousStruct1"), (1, "anonymousStruct2")]);
}

#[test]
fn imported_declarations_are_referenced_not_bound() {
    let mut index = NativeIndex::default();
    index.structs.push(forward_struct("FILE"));
    index.functions.push(function(
        "fclose",
        vec![param("f", CType::pointer(CType::Record(StructId::new(0))))],
        int(),
    ));
    let mut config = InteropConfig::new("native");
    config.imports.insert("FILE".into(), "posix".into());

    let result = build_with(&index, &config);
    assert!(result.forward_declarations.is_empty());
    assert_eq!(
        function_named(&result, "fclose").parameters[0].ty.to_string(),
        "cinterop.CPointer<posix.FILE>?"
    );
}

// ── Structs, enums, globals ────────────────────────────────────────

#[test]
fn struct_fields_carry_layout_annotations() {
    let mut index = NativeIndex::default();
    let flags = Field {
        bit_width: Some(3),
        ..field("flags", CType::int(4, false, "unsigned int"), 32)
    };
    let data = field(
        "data",
        CType::ConstArray {
            element: Box::new(int()),
            length: 4,
        },
        64,
    );
    index
        .structs
        .push(defined_struct("S", vec![field("x", int(), 0), flags, data]));

    let result = build(&index);
    let class = class_named(&result, "S");
    assert_eq!(class.kind, ClassKind::Struct);
    assert!(matches!(class.members[0], Stub::Constructor(_)));

    let x = property_named(&class.members, "x");
    match &x.kind {
        PropertyKind::Var { getter, setter } => {
            assert_eq!(
                getter.annotations,
                vec![AnnotationStub::GetMemberAt {
                    offset: 0,
                    by_value: true
                }]
            );
            assert_eq!(setter.annotations, vec![AnnotationStub::SetMemberAt { offset: 0 }]);
        }
        other => panic!("unexpected {other:?}"),
    }

    let flags = property_named(&class.members, "flags");
    let getter = flags.accessors().next().unwrap();
    assert_eq!(
        getter.annotations,
        vec![AnnotationStub::ReadBits {
            offset: 32,
            size: 3,
            signed: false
        }]
    );

    let data = property_named(&class.members, "data");
    assert!(!data.is_var());
    assert_eq!(data.ty.to_string(), "cinterop.CPointer<cinterop.IntVar>");
}

#[test]
fn unsupported_field_is_skipped_alone() {
    let mut index = NativeIndex::default();
    index.structs.push(defined_struct(
        "S",
        vec![
            field("ok", int(), 0),
            field("wide", CType::Unsupported("__int128".into()), 64),
        ],
    ));

    let result = build(&index);
    let class = class_named(&result, "S");
    assert_eq!(class.members.len(), 2);
    assert_eq!(result.diagnostics[0].declaration, "S.wide");
}

#[test]
fn enum_becomes_alias_and_constants() {
    let mut index = NativeIndex::default();
    index.enums.push(EnumDef {
        spelling: "Color".into(),
        base_type: CType::int(4, false, "unsigned int"),
        is_anonymous: false,
        constants: vec![
            EnumConstant {
                name: "RED".into(),
                value: 0,
            },
            EnumConstant {
                name: "GREEN".into(),
                value: 1,
            },
        ],
    });
    index.typedefs.push(TypedefDef {
        name: "Color".into(),
        aliased: CType::Enum(EnumId::new(0)),
    });

    let result = build(&index);
    let alias = alias_named(&result, "Color");
    assert_eq!(alias.aliasee, StubType::builtin("UInt"));
    assert_eq!(alias.mangled_name, "kenum:native.Color");
    let aliases = result
        .root
        .children
        .iter()
        .filter(|s| matches!(s, Stub::TypeAlias(_)))
        .count();
    assert_eq!(aliases, 1);

    let green = property_named(&result.root.children, "GREEN");
    assert_eq!(
        green.kind,
        PropertyKind::Constant {
            value: ConstantStub::Integer(1)
        }
    );
    assert!(matches!(&green.ty, StubType::Abbreviation { alias, .. } if alias.relative_name() == "Color"));
    assert_eq!(green.mangled_name, "kconst:#GREEN");
}

#[test]
fn globals_get_accessor_glue() {
    let mut index = NativeIndex::default();
    index.globals.push(GlobalDecl {
        name: "counter".into(),
        ty: int(),
        is_const: false,
    });
    index.globals.push(GlobalDecl {
        name: "version".into(),
        ty: int(),
        is_const: true,
    });

    let result = build(&index);
    let counter = property_named(&result.root.children, "counter");
    let ids: Vec<&str> = counter.accessors().filter_map(|a| a.ccall_id()).collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);

    let version = property_named(&result.root.children, "version");
    assert!(!version.is_var());
    assert_eq!(result.bridge_requests.len(), 3);
}

#[test]
fn macro_constants_keep_their_values() {
    let mut index = NativeIndex::default();
    index.constants.push(cinterop_ir::ConstantDef {
        name: "PI".into(),
        value: ConstantValue::FloatingPoint {
            value: 3.5,
            ty: CType::Float {
                size: 8,
                spelling: "double".into(),
            },
        },
    });
    index.constants.push(cinterop_ir::ConstantDef {
        name: "NAME".into(),
        value: ConstantValue::String("sqlite".into()),
    });

    let result = build(&index);
    let pi = property_named(&result.root.children, "PI");
    assert_eq!(
        pi.kind,
        PropertyKind::Constant {
            value: ConstantStub::double(3.5)
        }
    );
    assert_eq!(pi.mangled_name, "kmacro:#PI");
    let name = property_named(&result.root.children, "NAME");
    assert_eq!(name.ty, StubType::builtin("String"));
}

// ── Objective-C ────────────────────────────────────────────────────

fn method(selector: &str, is_class: bool, ret: CType) -> ObjCMethod {
    ObjCMethod {
        selector: selector.to_owned(),
        encoding: "@16@0:8".to_owned(),
        return_type: ret,
        parameters: Vec::new(),
        is_class,
        is_variadic: false,
        ns_returns_retained: is_class,
        ns_consumes_self: false,
    }
}

#[test]
fn objc_class_methods_go_to_companion() {
    let mut index = NativeIndex::default();
    index.language = cinterop_ir::Language::ObjC;
    index.objc_classes.push(ObjCClass {
        name: "Widget".into(),
        is_forward: false,
        base_class: None,
        protocols: Vec::new(),
        type_parameters: vec!["T".into()],
        methods: vec![
            method("new", true, CType::ObjCObjectPointer(ObjCClassId::new(0))),
            method("count", false, int()),
        ],
    });

    let result = build(&index);
    let class = class_named(&result, "Widget");
    assert_eq!(class.annotations, vec![AnnotationStub::ExternalObjCClass]);
    assert_eq!(class.type_parameters[0].key.owner, "native.Widget");

    let count = class
        .members
        .iter()
        .find_map(|s| match s {
            Stub::Function(f) => Some(f),
            _ => None,
        })
        .unwrap();
    assert_eq!(count.name, "count");
    assert!(count.annotations.iter().any(|a| matches!(a, AnnotationStub::ObjCMethod { selector, .. } if selector == "count")));

    let companion = class
        .members
        .iter()
        .find_map(|s| match s {
            Stub::Class(c) => Some(c),
            _ => None,
        })
        .unwrap();
    assert_eq!(companion.classifier.relative_name(), "Widget.Companion");
    let new = match &companion.members[0] {
        Stub::Function(f) => f,
        other => panic!("unexpected {other:?}"),
    };
    assert!(new.annotations.contains(&AnnotationStub::ReturnsRetained));
    assert!(result.bridge_requests.iter().any(|r| matches!(
        &r.target,
        BridgeTarget::MessageSend { receiver: MessageReceiver::Class(c), .. } if c == "Widget"
    )));
}

#[test]
fn category_on_forward_class_becomes_extension_container() {
    let mut index = NativeIndex::default();
    index.language = cinterop_ir::Language::ObjC;
    index.objc_classes.push(ObjCClass {
        name: "NSString".into(),
        is_forward: true,
        base_class: None,
        protocols: Vec::new(),
        type_parameters: Vec::new(),
        methods: Vec::new(),
    });
    index.objc_categories.push(ObjCCategory {
        name: "Extras".into(),
        class: ObjCClassId::new(0),
        methods: vec![method("shout", false, CType::Void)],
    });

    let result = build(&index);
    let container = result
        .root
        .children
        .iter()
        .find_map(|s| match s {
            Stub::Container(c) => Some(c),
            _ => None,
        })
        .unwrap();
    assert_eq!(container.name, "NSString+Extras");
    let shout = container.functions()[0];
    assert_eq!(
        shout.receiver,
        Some(StubType::classifier(Classifier::new(
            "objcnames.classes",
            "NSString"
        )))
    );
    assert_eq!(
        result.forward_declaration_names(),
        vec!["objcnames.classes.NSString".to_owned()]
    );
}

#[test]
fn forward_protocol_placeholder_uses_the_bound_protocol_name() {
    let mut index = NativeIndex::default();
    index.language = cinterop_ir::Language::ObjC;
    index.objc_classes.push(ObjCClass {
        name: "NSObject".into(),
        is_forward: true,
        base_class: None,
        protocols: Vec::new(),
        type_parameters: Vec::new(),
        methods: Vec::new(),
    });
    index.objc_protocols.push(ObjCProtocol {
        name: "NSObject".into(),
        is_forward: true,
        protocols: Vec::new(),
        methods: Vec::new(),
    });
    index.functions.push(function(
        "take",
        vec![param(
            "o",
            CType::ObjCId {
                protocols: vec![ObjCProtocolId::new(0)],
            },
        )],
        CType::Void,
    ));

    let result = build(&index);
    assert_eq!(
        result.forward_declaration_names(),
        vec![
            "objcnames.classes.NSObject".to_owned(),
            "objcnames.protocols.NSObjectProtocol".to_owned(),
        ]
    );
}

#[test]
fn building_twice_is_identical() {
    let mut index = NativeIndex::default();
    index.structs.push(defined_struct("", vec![field("a", int(), 0)]));
    index.structs.push(forward_struct("Opaque"));
    index
        .functions
        .push(function("add", vec![param("a", int()), param("b", int())], int()));

    let a = build(&index);
    let b = build(&index);
    assert_eq!(a.root, b.root);
    assert_eq!(a.bridge_requests, b.bridge_requests);
    assert_eq!(a.forward_declarations, b.forward_declarations);
}
