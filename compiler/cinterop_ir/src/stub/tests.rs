use super::*;
use pretty_assertions::assert_eq;

fn int() -> StubType {
    StubType::builtin("Int")
}

fn external_function(name: &str) -> FunctionStub {
    FunctionStub {
        name: name.into(),
        return_type: int(),
        parameters: vec![
            FunctionParameterStub::new("a", int()),
            FunctionParameterStub::new("b", int()),
        ],
        type_parameters: vec![],
        receiver: None,
        flags: StubFlags::PUBLIC_EXTERNAL,
        annotations: vec![AnnotationStub::CCall {
            id: format!("knibridge_{name}"),
        }],
        mangled_name: format!("kfun:#{name}(lang.Int;lang.Int)"),
    }
}

#[test]
fn test_setter_parameter_is_named_value() {
    let setter = PropertyAccessor::setter(int(), StubFlags::PUBLIC_EXTERNAL, vec![]);
    match &setter.kind {
        AccessorKind::Setter { parameter } => {
            assert_eq!(parameter.name, "value");
            assert_eq!(parameter.ty, int());
        }
        AccessorKind::Getter => panic!("expected a setter"),
    }
}

#[test]
fn test_property_accessors_per_kind() {
    let getter = PropertyAccessor::getter(StubFlags::PUBLIC, vec![]);
    let setter = PropertyAccessor::setter(int(), StubFlags::PUBLIC, vec![]);
    let mut prop = PropertyStub {
        name: "errno".into(),
        ty: int(),
        kind: PropertyKind::Var {
            getter: getter.clone(),
            setter,
        },
        receiver: None,
        flags: StubFlags::PUBLIC,
        annotations: vec![],
        mangled_name: "kvar:errno".into(),
    };
    assert_eq!(prop.accessors().count(), 2);
    assert!(prop.is_var());

    prop.kind = PropertyKind::Val { getter };
    assert_eq!(prop.accessors().count(), 1);
    assert!(!prop.is_var());

    prop.kind = PropertyKind::Constant {
        value: ConstantStub::Integer(0),
    };
    assert_eq!(prop.accessors().count(), 0);
}

#[test]
fn test_container_functions_walks_class_members() {
    let mut root = StubContainer::new("math");
    root.push(Stub::Function(external_function("add")));
    root.push(Stub::Class(ClassStub {
        classifier: Classifier::new("math", "Calc"),
        kind: ClassKind::ObjCClass,
        flags: StubFlags::PUBLIC,
        annotations: vec![],
        supertypes: vec![],
        type_parameters: vec![],
        members: vec![Stub::Function(external_function("mul"))],
        mangled_name: "kclass:math.Calc".into(),
    }));

    let names: Vec<_> = root.functions().iter().map(|f| f.name.clone()).collect();
    assert_eq!(names, vec!["add".to_owned(), "mul".to_owned()]);
    assert_eq!(root.functions()[0].ccall_id(), Some("knibridge_add"));
}

#[test]
fn test_double_constant_keeps_bits() {
    let c = ConstantStub::double(1.5);
    assert_eq!(c.as_f64(), Some(1.5));
    assert_eq!(ConstantStub::Integer(1).as_f64(), None);
}

#[test]
fn test_stub_names() {
    let f = Stub::Function(external_function("add"));
    assert_eq!(f.kind_name(), "function");
    assert_eq!(f.name(), "add");
    assert_eq!(f.flags(), StubFlags::PUBLIC_EXTERNAL);
    assert_eq!(f.annotations().len(), 1);
}
