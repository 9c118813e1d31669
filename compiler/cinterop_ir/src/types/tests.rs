use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_fq_names() {
    let c = Classifier::new("sqlite.core", "Handle");
    assert_eq!(c.fq_name(), "sqlite.core.Handle");
    assert_eq!(c.fq_name_serialized(), "sqlite/core/Handle");
    assert_eq!(c.simple_name(), "Handle");
}

#[test]
fn test_nested_classifier_keeps_dot_in_relative_name() {
    let inner = Classifier::new("pkg", "Outer").nested("Inner");
    assert_eq!(inner.relative_name(), "Outer.Inner");
    assert_eq!(inner.simple_name(), "Inner");
    assert_eq!(inner.fq_name_serialized(), "pkg/Outer.Inner");
}

#[test]
fn test_root_package_names() {
    let c = Classifier::new("", "Top");
    assert_eq!(c.fq_name(), "Top");
    assert_eq!(c.fq_name_serialized(), "Top");
}

#[test]
fn test_display_renders_arguments_and_nullability() {
    let ty = StubType::wrapper(
        Classifier::runtime("CPointer"),
        vec![TypeArgument::invariant(StubType::builtin("Int"))],
    )
    .with_nullable(true);
    assert_eq!(ty.to_string(), "cinterop.CPointer<lang.Int>?");
}

#[test]
fn test_abbreviation_names_the_alias() {
    let ty = StubType::Abbreviation {
        alias: Classifier::new("pkg", "size_t"),
        expanded: Box::new(StubType::builtin("ULong")),
        nullable: false,
    };
    assert_eq!(ty.named(), Some(Classifier::new("pkg", "size_t")));

    let mut seen = Vec::new();
    ty.for_each_classifier(&mut |c| seen.push(c.fq_name()));
    assert_eq!(seen, vec!["pkg.size_t".to_owned(), "lang.ULong".to_owned()]);
}

#[test]
fn test_type_parameter_has_no_name() {
    let ty = StubType::TypeParameter {
        key: TypeParamKey::new("pkg.NSArray", "ObjectType"),
        nullable: true,
    };
    assert_eq!(ty.named(), None);
    assert_eq!(ty.to_string(), "ObjectType?");
}
