use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn int() -> StubType {
    StubType::builtin("Int")
}

#[test]
fn function_mangling_lists_parameter_types() {
    let m = InteropMangler::new();
    let params = [int(), int()];
    assert_eq!(
        m.mangle(&MangleTarget::Function {
            name: "add",
            parameters: &params,
        }),
        "kfun:#add(lang.Int;lang.Int)"
    );
    assert_eq!(
        m.mangle(&MangleTarget::Function {
            name: "tick",
            parameters: &[],
        }),
        "kfun:#tick()"
    );
}

#[test]
fn overloads_by_parameter_type_differ() {
    let m = InteropMangler::new();
    let a = [int()];
    let b = [StubType::builtin("Long")];
    let ma = m.mangle(&MangleTarget::Function {
        name: "f",
        parameters: &a,
    });
    let mb = m.mangle(&MangleTarget::Function {
        name: "f",
        parameters: &b,
    });
    assert_ne!(ma, mb);
    assert_ne!(hash_mangle(&ma), hash_mangle(&mb));
}

#[test]
fn declaration_prefixes() {
    let m = InteropMangler::new();
    let point = Classifier::new("geo", "Point");
    assert_eq!(m.mangle(&MangleTarget::Struct(&point)), "kstruct:geo.Point");
    assert_eq!(m.mangle(&MangleTarget::Enum(&point)), "kenum:geo.Point");
    assert_eq!(m.mangle(&MangleTarget::Typedef(&point)), "ktypedef:geo.Point");
    assert_eq!(m.mangle(&MangleTarget::ObjCClass(&point)), "kclass:geo.Point");
    assert_eq!(
        m.mangle(&MangleTarget::ObjCProtocol(&point)),
        "kprotocol:geo.Point"
    );
    assert_eq!(
        m.mangle(&MangleTarget::Field {
            owner: &point,
            name: "x"
        }),
        "kvar:geo.Point#x"
    );
    assert_eq!(m.mangle(&MangleTarget::Global("errno")), "kvar:#errno");
    assert_eq!(m.mangle(&MangleTarget::EnumConstant("RED")), "kconst:#RED");
    assert_eq!(m.mangle(&MangleTarget::Macro("VERSION")), "kmacro:#VERSION");
}

#[test]
fn objc_class_methods_live_on_the_companion() {
    let m = InteropMangler::new();
    let view = Classifier::new("ui", "NSView");
    let instance = m.mangle(&MangleTarget::ObjCMethod {
        owner: &view,
        selector: "alloc",
        is_class: false,
        parameters: &[],
    });
    let class = m.mangle(&MangleTarget::ObjCMethod {
        owner: &view,
        selector: "alloc",
        is_class: true,
        parameters: &[],
    });
    assert_eq!(instance, "kfun:ui.NSView#alloc()");
    assert_eq!(class, "kfun:ui.NSView.Companion#alloc()");
}

#[test]
fn hash_sets_public_bit() {
    let id = hash_mangle("kfun:#add(lang.Int;lang.Int)");
    assert!(id.is_public());
    let raw = city_hash64(b"kfun:#add(lang.Int;lang.Int)");
    assert_eq!(id, UniqId::public(raw));
}

#[test]
fn placeholders_hash_as_their_declaration_kind() {
    let opaque = ForwardKind::CStruct.classifier("Opaque");
    assert_eq!(
        forward_declaration_id(&opaque),
        Some(hash_mangle("kstruct:cnames.structs.Opaque"))
    );
    let view = ForwardKind::ObjCClass.classifier("NSView");
    assert_eq!(
        forward_declaration_id(&view),
        Some(hash_mangle("kclass:objcnames.classes.NSView"))
    );
    assert_eq!(forward_declaration_id(&Classifier::new("geo", "Point")), None);
}

#[test]
fn bridge_symbol_is_a_c_identifier() {
    let symbol = bridge_symbol("kfun:#add(lang.Int;lang.Int)");
    assert_eq!(symbol, "knibridge_kfun$CL$HSadd$LPlang$DTInt$SClang$DTInt$RP");
    assert!(symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$'));
}

#[test]
fn bridge_symbol_escapes_non_ascii() {
    assert_eq!(bridge_symbol("é"), "knibridge_$u0000e9");
}

proptest! {
    #[test]
    fn mangling_is_deterministic(name in "[a-z_][a-z0-9_]{0,20}", n in 0usize..4) {
        let params: Vec<StubType> = (0..n).map(|_| int()).collect();
        let m = InteropMangler::new();
        let target = MangleTarget::Function { name: &name, parameters: &params };
        let first = m.mangle(&target);
        prop_assert_eq!(&first, &m.mangle(&target));
        prop_assert_eq!(hash_mangle(&first), hash_mangle(&first));
        prop_assert_eq!(bridge_symbol(&first), bridge_symbol(&first));
    }

    #[test]
    fn bridge_symbols_are_injective(a in "[ -~]{0,12}", b in "[ -~]{0,12}") {
        prop_assume!(a != b);
        prop_assert_ne!(bridge_symbol(&a), bridge_symbol(&b));
    }
}
