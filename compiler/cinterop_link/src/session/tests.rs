use std::path::Path;

use cinterop_ir::{ForwardKind, UniqId};
use cinterop_klib::{
    encode_package, ClassDescriptor, ClassDescriptorKind, DeclFlags, FunctionDescriptor,
    LibraryWriter, PackageDescriptor, ProjectionVariance, TypeArgumentDescriptor,
    TypeDescriptor, ValueParameterDescriptor,
};
use pretty_assertions::assert_eq;

use super::*;

const OPAQUE_PLACEHOLDER: UniqId = UniqId::public(0x0f0f);
const REAL_OPAQUE: UniqId = UniqId::public(0xbeef);

fn class(name: &str, uniq_id: UniqId) -> ClassDescriptor {
    ClassDescriptor {
        name: name.to_owned(),
        kind: ClassDescriptorKind::Class,
        flags: DeclFlags::PUBLIC | DeclFlags::FINAL | DeclFlags::DECLARATION,
        uniq_id,
        type_parameters: Vec::new(),
        supertypes: Vec::new(),
        constructors: Vec::new(),
        functions: Vec::new(),
        properties: Vec::new(),
        annotations: Vec::new(),
    }
}

fn placeholder_type() -> TypeDescriptor {
    let name = ForwardKind::CStruct.classifier("Opaque").fq_name_serialized();
    TypeDescriptor::class(name, Some(OPAQUE_PLACEHOLDER))
}

/// `fun use_opaque(p: CPointer<cnames.structs.Opaque>): Unit`
fn user_package() -> PackageDescriptor {
    let mut pointer = TypeDescriptor::class("cinterop/CPointer", None);
    pointer.arguments.push(TypeArgumentDescriptor::Projection {
        variance: ProjectionVariance::Invariant,
        ty: placeholder_type(),
    });
    let mut package = PackageDescriptor::new("user");
    package.functions.push(FunctionDescriptor {
        name: "use_opaque".to_owned(),
        flags: DeclFlags::PUBLIC | DeclFlags::EXTERNAL | DeclFlags::DECLARATION,
        uniq_id: UniqId::public(0x1001),
        type_parameters: Vec::new(),
        receiver: None,
        value_parameters: vec![ValueParameterDescriptor {
            name: "p".to_owned(),
            ty: pointer,
            vararg_element_type: None,
            annotations: Vec::new(),
        }],
        return_type: TypeDescriptor::class("lang/Unit", None),
        annotations: Vec::new(),
    });
    package
}

fn library(name: &str, packages: &[PackageDescriptor]) -> Library {
    let mut writer = LibraryWriter::new(name);
    for package in packages {
        writer = writer.add_fragment(encode_package(package));
    }
    let bytes = writer.to_bytes().unwrap();
    Library::from_bytes(Path::new(name), bytes).unwrap()
}

fn defining_library() -> Library {
    let mut package = PackageDescriptor::new("native");
    package.classes.push(class("native/Opaque", REAL_OPAQUE));
    package.classes.push(class("native/Other", UniqId::public(0xcafe)));
    library("native", &[package])
}

fn parameter_class(program: &LinkedProgram) -> (String, Option<UniqId>) {
    let function = &program.module("user").unwrap().packages[0].functions[0];
    let TypeArgumentDescriptor::Projection { ty, .. } = &function.value_parameters[0].ty.arguments[0]
    else {
        panic!("expected a projection");
    };
    match &ty.kind {
        TypeKind::Class { name, uniq_id } => (name.clone(), *uniq_id),
        TypeKind::TypeParameter(_) => panic!("expected a class type"),
    }
}

#[test]
fn forward_module_is_registered_first() {
    let session = LinkSession::new();
    let module = session.module(LinkSession::FORWARD_MODULE).unwrap();
    assert!(matches!(module.kind, ModuleKind::ForwardDeclarations));
    assert_eq!(module.file_count(), 0);
    assert!(!module.has_serialized_form());
    assert!(matches!(
        session.module(ModuleId::new(7)),
        Err(LinkError::UnknownModule(_))
    ));
}

#[test]
fn placeholder_resolves_to_library_class() {
    let mut session = LinkSession::new();
    session.add_library(defining_library());

    let name = ForwardKind::CStruct.classifier("Opaque").fq_name_serialized();
    let target = session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap();

    assert_eq!(target, REAL_OPAQUE);
    assert_eq!(
        session.state(OPAQUE_PLACEHOLDER),
        ForwardState::Resolved(REAL_OPAQUE)
    );
    assert_eq!(
        session.forward_declarations().target_name(REAL_OPAQUE),
        Some("native/Opaque")
    );
}

#[test]
fn resolution_is_searched_once() {
    let mut session = LinkSession::new();
    session.add_library(defining_library());
    let name = ForwardKind::CStruct.classifier("Opaque").fq_name_serialized();

    let first = session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap();
    let second = session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap();

    assert_eq!(first, second);
    assert_eq!(session.search_count(), 1);
}

#[test]
fn non_placeholder_references_are_untouched() {
    let mut session = LinkSession::new();
    session.add_library(defining_library());

    let id = UniqId::public(42);
    assert_eq!(session.resolve_class("native/Opaque", id).unwrap(), id);
    assert_eq!(session.search_count(), 0);
}

#[test]
fn decoding_is_memoized() {
    let mut session = LinkSession::new();
    let native = session.add_library(defining_library());
    let index = DeclIndex::new(0, SymbolId::new(0));

    let first = session.declaration(native, index).unwrap().uniq_id();
    let second = session.declaration(native, index).unwrap().uniq_id();

    assert_eq!(first, REAL_OPAQUE);
    assert_eq!(first, second);
    assert_eq!(session.decoded_count(), 1);
}

#[test]
fn finish_rewrites_references_across_modules() {
    let mut session = LinkSession::new();
    session.add_library(library("user", &[user_package()]));
    session.add_library(defining_library());

    let program = session.finish().unwrap();

    assert_eq!(
        parameter_class(&program),
        ("native/Opaque".to_owned(), Some(REAL_OPAQUE))
    );
    assert!(program.forward_declarations.is_empty());
    let ids = program.referenced_uniq_ids();
    assert!(ids.contains(&REAL_OPAQUE));
    assert!(!ids.contains(&OPAQUE_PLACEHOLDER));
}

#[test]
fn unresolved_placeholder_becomes_opaque_class() {
    let mut session = LinkSession::new();
    session.add_library(library("user", &[user_package()]));

    let program = session.finish().unwrap();

    let (name, id) = parameter_class(&program);
    assert_eq!(name, "cnames/structs/Opaque");
    assert_eq!(id, Some(OPAQUE_PLACEHOLDER));

    let classes: Vec<_> = program.forward_declarations.classes().collect();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].name, "cnames/structs/Opaque");
    assert_eq!(classes[0].uniq_id, OPAQUE_PLACEHOLDER);
    assert_eq!(classes[0].kind, ClassDescriptorKind::Opaque);
    assert_eq!(program.forward_declarations.packages[0].fq_name, "cnames.structs");
}

#[test]
fn source_only_class_keeps_the_placeholder() {
    let mut session = LinkSession::new();
    let mut source = PackageDescriptor::new("native");
    source.classes.push(class("native/Opaque", REAL_OPAQUE));
    session.add_source_module("in-progress", vec![source]);

    let name = ForwardKind::CStruct.classifier("Opaque").fq_name_serialized();
    let target = session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap();

    assert_eq!(target, OPAQUE_PLACEHOLDER);
    assert_eq!(session.state(OPAQUE_PLACEHOLDER), ForwardState::Unresolved);
}

#[test]
fn unresolved_placeholder_is_searched_again() {
    let mut session = LinkSession::new();
    let name = ForwardKind::CStruct.classifier("Opaque").fq_name_serialized();

    assert_eq!(
        session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap(),
        OPAQUE_PLACEHOLDER
    );
    session.add_library(defining_library());
    assert_eq!(
        session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap(),
        REAL_OPAQUE
    );
    assert_eq!(session.search_count(), 2);
}

#[test]
fn reserved_packages_are_not_resolution_targets() {
    let mut session = LinkSession::new();
    let mut forward = PackageDescriptor::new("cnames.structs");
    forward.classes.push(class("cnames/structs/Opaque", UniqId::public(0x77)));
    session.add_library(library("fwd", &[forward]));

    let name = ForwardKind::CStruct.classifier("Opaque").fq_name_serialized();
    assert_eq!(
        session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap(),
        OPAQUE_PLACEHOLDER
    );
}

#[test]
fn module_reads_are_local_to_a_fragment() {
    let mut session = LinkSession::new();
    let native = session.add_library(defining_library());
    let module = session.module(native).unwrap();

    assert_eq!(module.file_count(), 1);
    let symbol = module.read_symbol(0, SymbolId::new(1)).unwrap();
    assert_eq!(module.read_string(0, symbol.name).unwrap(), "native/Other");
    assert!(matches!(module.read_file(3), Err(LinkError::Library(_))));

    let forward = session.module(LinkSession::FORWARD_MODULE).unwrap();
    assert!(matches!(
        forward.read_file(0),
        Err(LinkError::NoSerializedForm { .. })
    ));
}

#[test]
fn protocol_placeholder_skips_a_class_of_the_same_name() {
    let class_id = UniqId::public(0xa1);
    let protocol_id = UniqId::public(0xa2);
    let mut defs = PackageDescriptor::new("defs");
    defs.classes.push(class("defs/NSObject", class_id));
    defs.classes.push(ClassDescriptor {
        kind: ClassDescriptorKind::Interface,
        ..class("defs/NSObjectProtocol", protocol_id)
    });
    let mut session = LinkSession::new();
    session.add_library(library("defs", &[defs]));

    let protocol = ForwardKind::ObjCProtocol
        .classifier("NSObject")
        .fq_name_serialized();
    let class_placeholder = ForwardKind::ObjCClass
        .classifier("NSObject")
        .fq_name_serialized();

    assert_eq!(
        session.resolve_class(&protocol, UniqId::public(1)).unwrap(),
        protocol_id
    );
    assert_eq!(
        session.forward_declarations().target_name(protocol_id),
        Some("defs/NSObjectProtocol")
    );
    assert_eq!(
        session
            .resolve_class(&class_placeholder, UniqId::public(2))
            .unwrap(),
        class_id
    );
}

#[test]
fn struct_placeholder_ignores_interfaces() {
    let mut defs = PackageDescriptor::new("defs");
    defs.classes.push(ClassDescriptor {
        kind: ClassDescriptorKind::Interface,
        ..class("defs/Opaque", REAL_OPAQUE)
    });
    let mut session = LinkSession::new();
    session.add_library(library("defs", &[defs]));

    let name = ForwardKind::CStruct.classifier("Opaque").fq_name_serialized();
    assert_eq!(
        session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap(),
        OPAQUE_PLACEHOLDER
    );
}

#[test]
fn repeated_miss_is_not_searched_again() {
    let mut session = LinkSession::new();
    let mut source = PackageDescriptor::new("native");
    source.classes.push(class("native/Opaque", REAL_OPAQUE));
    session.add_source_module("in-progress", vec![source]);
    let name = ForwardKind::CStruct.classifier("Opaque").fq_name_serialized();

    for _ in 0..3 {
        assert_eq!(
            session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap(),
            OPAQUE_PLACEHOLDER
        );
    }
    assert_eq!(session.search_count(), 1);

    session.add_library(defining_library());
    assert_eq!(
        session.resolve_class(&name, OPAQUE_PLACEHOLDER).unwrap(),
        REAL_OPAQUE
    );
    assert_eq!(session.search_count(), 2);
}
