use super::*;
use pretty_assertions::assert_eq;

fn int_type() -> TypeDescriptor {
    TypeDescriptor::class("lang/Int", None)
}

fn ccall(id: &str) -> AnnotationDescriptor {
    let mut arguments = BTreeMap::new();
    arguments.insert("id".to_owned(), AnnotationArgument::String(id.to_owned()));
    AnnotationDescriptor {
        class_name: "cinterop/internal/CCall".to_owned(),
        arguments,
    }
}

fn add_function() -> FunctionDescriptor {
    FunctionDescriptor {
        name: "add".into(),
        flags: DeclFlags::PUBLIC | DeclFlags::EXTERNAL | DeclFlags::HAS_ANNOTATIONS,
        uniq_id: UniqId::public(0x1234),
        type_parameters: vec![],
        receiver: None,
        value_parameters: ["a", "b"]
            .iter()
            .map(|n| ValueParameterDescriptor {
                name: (*n).to_owned(),
                ty: int_type(),
                vararg_element_type: None,
                annotations: vec![],
            })
            .collect(),
        return_type: int_type(),
        annotations: vec![ccall("knibridge_add")],
    }
}

fn sample_package() -> PackageDescriptor {
    let mut package = PackageDescriptor::new("math");
    package.functions.push(add_function());
    package.properties.push(PropertyDescriptor {
        name: "ANSWER".into(),
        flags: DeclFlags::PUBLIC | DeclFlags::CONST | DeclFlags::FINAL,
        uniq_id: UniqId::public(0x99),
        ty: int_type(),
        receiver: None,
        getter: None,
        setter: None,
        constant: Some(ConstantValue::Integer(42)),
        annotations: vec![],
    });
    package.type_aliases.push(TypeAliasDescriptor {
        name: "math/count_t".into(),
        flags: DeclFlags::PUBLIC,
        uniq_id: UniqId::public(0x77),
        underlying: int_type(),
        expanded: int_type(),
        annotations: vec![],
    });
    package
}

#[test]
fn test_strings_and_types_are_deduplicated() {
    let fragment = encode_package(&sample_package());

    let ints = fragment
        .strings
        .iter()
        .filter(|s| *s == "lang/Int")
        .count();
    assert_eq!(ints, 1);
    // `lang/Int` is the only type in the package.
    assert_eq!(fragment.types.len(), 1);
    assert!(!fragment.is_empty);
}

#[test]
fn test_decode_restores_package() {
    let package = sample_package();
    let fragment = encode_package(&package);
    let decoded = fragment.decoder().package().unwrap();
    assert_eq!(decoded, package);
}

#[test]
fn test_constants_go_to_bodies_table() {
    let fragment = encode_package(&sample_package());
    assert_eq!(fragment.bodies, vec![ConstantValue::Integer(42)]);
    assert_eq!(
        fragment.package.properties[0].constant,
        Some(BodyId::new(0))
    );
}

#[test]
fn test_symbol_table_finds_declaration_by_identity() {
    let fragment = encode_package(&sample_package());
    let decoder = fragment.decoder();

    let id = decoder.find_symbol(UniqId::public(0x1234)).unwrap();
    let symbol = decoder.symbol(id).unwrap();
    assert_eq!(symbol.kind, DeclKind::Function);
    assert_eq!(decoder.string(symbol.name).unwrap(), "add");
    assert_eq!(decoder.function(symbol.index).unwrap(), add_function());

    assert_eq!(decoder.find_symbol(UniqId::public(0xdead)), None);
}

#[test]
fn test_bad_index_names_the_table() {
    let fragment = encode_package(&sample_package());
    let err = fragment.decoder().class(3).unwrap_err();
    assert_eq!(
        err.to_string(),
        "class index 3 out of range in fragment 'math'"
    );
}

#[test]
fn test_abbreviated_type_survives() {
    let mut ty = int_type();
    ty.abbreviation = Some(Box::new(TypeDescriptor::class(
        "math/count_t",
        Some(UniqId::public(0x77)),
    )));
    let mut package = PackageDescriptor::new("math");
    let mut f = add_function();
    f.return_type = ty.clone();
    package.functions.push(f);

    let fragment = encode_package(&package);
    let decoded = fragment.decoder().function(0).unwrap();
    assert_eq!(decoded.return_type, ty);
}

#[test]
fn test_empty_fragment_and_bincode() {
    let fragment = PackageFragment::empty("");
    assert!(fragment.is_empty);
    let bytes = fragment.to_bytes().unwrap();
    assert_eq!(PackageFragment::from_bytes(&bytes).unwrap(), fragment);
}
