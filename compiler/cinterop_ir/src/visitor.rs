//! Shared dispatch over the Stub IR variant set.
//!
//! Every emitter implements [`StubIrVisitor`]. The trait has no default
//! methods: an emitter that has no rendering for a variant says so by
//! returning [`UnsupportedStub`] from that method. Reaching such a method is
//! a builder bug, so emitters fail fast instead of skipping the node.
//!
//! [`Stub::accept`] matches exhaustively; adding a variant to [`Stub`]
//! breaks the build until `accept` and every visitor handle it.

use crate::stub::{
    ClassStub, ConstructorStub, FunctionStub, PropertyAccessor, PropertyStub, Stub,
    StubContainer, TypeAliasStub,
};

/// A stub variant reached by an emitter that does not support it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported stub: {kind} `{name}`")]
pub struct UnsupportedStub {
    pub kind: &'static str,
    pub name: String,
}

impl UnsupportedStub {
    pub fn of(stub: &Stub) -> Self {
        UnsupportedStub {
            kind: stub.kind_name(),
            name: stub.name(),
        }
    }

    pub fn new(kind: &'static str, name: impl Into<String>) -> Self {
        UnsupportedStub {
            kind,
            name: name.into(),
        }
    }
}

pub trait StubIrVisitor {
    type Output;
    type Error: From<UnsupportedStub>;

    fn visit_class(&mut self, class: &ClassStub) -> Result<Self::Output, Self::Error>;

    fn visit_type_alias(&mut self, alias: &TypeAliasStub) -> Result<Self::Output, Self::Error>;

    fn visit_function(&mut self, function: &FunctionStub) -> Result<Self::Output, Self::Error>;

    fn visit_property(&mut self, property: &PropertyStub) -> Result<Self::Output, Self::Error>;

    fn visit_constructor(
        &mut self,
        constructor: &ConstructorStub,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_property_accessor(
        &mut self,
        accessor: &PropertyAccessor,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_container(&mut self, container: &StubContainer)
        -> Result<Self::Output, Self::Error>;
}

impl Stub {
    pub fn accept<V: StubIrVisitor + ?Sized>(&self, visitor: &mut V) -> Result<V::Output, V::Error> {
        match self {
            Stub::Class(c) => visitor.visit_class(c),
            Stub::TypeAlias(t) => visitor.visit_type_alias(t),
            Stub::Function(f) => visitor.visit_function(f),
            Stub::Property(p) => visitor.visit_property(p),
            Stub::Constructor(c) => visitor.visit_constructor(c),
            Stub::PropertyAccessor(a) => visitor.visit_property_accessor(a),
            Stub::Container(c) => visitor.visit_container(c),
        }
    }
}
