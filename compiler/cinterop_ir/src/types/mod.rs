//! Type references used by Stub IR declarations.
//!
//! A `StubType` always bottoms out in a named classifier, except for
//! `TypeParameter`, which points at an enclosing generic parameter by key.
//! The key is interned to a small integer only when metadata is emitted, so
//! the same parameter seen from a class and from its members maps to one id.

use std::fmt;

/// Package of host builtin types (`Int`, `Unit`, ...).
pub const BUILTINS_PACKAGE: &str = "lang";

/// Package of the interop runtime (`CPointer`, `CValue`, ...).
pub const RUNTIME_PACKAGE: &str = "cinterop";

// ── Classifier ─────────────────────────────────────────────────────

/// A named type: a package plus a name relative to it.
///
/// Nested classes use `.` inside `relative_name` (`Outer.Inner`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Classifier {
    package: String,
    relative_name: String,
}

impl Classifier {
    pub fn new(package: impl Into<String>, relative_name: impl Into<String>) -> Self {
        Classifier {
            package: package.into(),
            relative_name: relative_name.into(),
        }
    }

    pub fn builtin(name: &str) -> Self {
        Self::new(BUILTINS_PACKAGE, name)
    }

    pub fn runtime(name: &str) -> Self {
        Self::new(RUNTIME_PACKAGE, name)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn relative_name(&self) -> &str {
        &self.relative_name
    }

    /// Last segment of the relative name.
    pub fn simple_name(&self) -> &str {
        self.relative_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.relative_name)
    }

    /// Classifier of a class nested in this one.
    pub fn nested(&self, name: &str) -> Self {
        Self::new(
            self.package.clone(),
            format!("{}.{name}", self.relative_name),
        )
    }

    /// Dotted fully qualified name: `pkg.sub.Name`.
    pub fn fq_name(&self) -> String {
        if self.package.is_empty() {
            self.relative_name.clone()
        } else {
            format!("{}.{}", self.package, self.relative_name)
        }
    }

    /// Metadata form: package segments joined with `/`, then `/Name`.
    pub fn fq_name_serialized(&self) -> String {
        if self.package.is_empty() {
            self.relative_name.clone()
        } else {
            format!("{}/{}", self.package.replace('.', "/"), self.relative_name)
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            f.write_str(&self.relative_name)
        } else {
            write!(f, "{}.{}", self.package, self.relative_name)
        }
    }
}

// ── Type parameters ────────────────────────────────────────────────

/// Identity of a type parameter: its declaring owner and its name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeParamKey {
    pub owner: String,
    pub name: String,
}

impl TypeParamKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        TypeParamKey {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeParameterStub {
    pub key: TypeParamKey,
    pub upper_bound: Option<StubType>,
}

impl TypeParameterStub {
    pub fn name(&self) -> &str {
        &self.key.name
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variance {
    Invariant,
    In,
    Out,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    Star,
    Projection { variance: Variance, ty: StubType },
}

impl TypeArgument {
    pub fn invariant(ty: StubType) -> Self {
        TypeArgument::Projection {
            variance: Variance::Invariant,
            ty,
        }
    }
}

// ── StubType ───────────────────────────────────────────────────────

/// Reference to a type from a Stub IR declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StubType {
    /// A named type, possibly generic.
    Classifier {
        classifier: Classifier,
        type_arguments: Vec<TypeArgument>,
        nullable: bool,
    },
    /// An enclosing generic parameter.
    TypeParameter { key: TypeParamKey, nullable: bool },
    /// A class nested inside another declaration.
    Nested {
        outer: Classifier,
        name: String,
        nullable: bool,
    },
    /// A typealias reference; both the alias and its expansion are kept.
    Abbreviation {
        alias: Classifier,
        expanded: Box<StubType>,
        nullable: bool,
    },
    /// A host-runtime type that is not one of this binding's declarations.
    Wrapper {
        classifier: Classifier,
        type_arguments: Vec<TypeArgument>,
        nullable: bool,
    },
}

impl StubType {
    pub fn classifier(classifier: Classifier) -> Self {
        StubType::Classifier {
            classifier,
            type_arguments: Vec::new(),
            nullable: false,
        }
    }

    pub fn builtin(name: &str) -> Self {
        Self::wrapper(Classifier::builtin(name), Vec::new())
    }

    pub fn wrapper(classifier: Classifier, type_arguments: Vec<TypeArgument>) -> Self {
        StubType::Wrapper {
            classifier,
            type_arguments,
            nullable: false,
        }
    }

    pub fn unit() -> Self {
        Self::builtin("Unit")
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            StubType::Classifier { nullable, .. }
            | StubType::TypeParameter { nullable, .. }
            | StubType::Nested { nullable, .. }
            | StubType::Abbreviation { nullable, .. }
            | StubType::Wrapper { nullable, .. } => *nullable,
        }
    }

    #[must_use]
    pub fn with_nullable(mut self, value: bool) -> Self {
        match &mut self {
            StubType::Classifier { nullable, .. }
            | StubType::TypeParameter { nullable, .. }
            | StubType::Nested { nullable, .. }
            | StubType::Abbreviation { nullable, .. }
            | StubType::Wrapper { nullable, .. } => *nullable = value,
        }
        self
    }

    /// The concrete name this reference bottoms out in.
    ///
    /// Abbreviations resolve to the alias, not the expansion.
    pub fn named(&self) -> Option<Classifier> {
        match self {
            StubType::Classifier { classifier, .. } | StubType::Wrapper { classifier, .. } => {
                Some(classifier.clone())
            }
            StubType::Abbreviation { alias, .. } => Some(alias.clone()),
            StubType::Nested { outer, name, .. } => Some(outer.nested(name)),
            StubType::TypeParameter { .. } => None,
        }
    }

    pub fn type_arguments(&self) -> &[TypeArgument] {
        match self {
            StubType::Classifier { type_arguments, .. }
            | StubType::Wrapper { type_arguments, .. } => type_arguments,
            _ => &[],
        }
    }

    /// Every classifier reachable from this type, outermost first.
    pub fn for_each_classifier<'a>(&'a self, f: &mut impl FnMut(&'a Classifier)) {
        match self {
            StubType::Classifier {
                classifier,
                type_arguments,
                ..
            }
            | StubType::Wrapper {
                classifier,
                type_arguments,
                ..
            } => {
                f(classifier);
                for arg in type_arguments {
                    if let TypeArgument::Projection { ty, .. } = arg {
                        ty.for_each_classifier(f);
                    }
                }
            }
            StubType::Abbreviation {
                alias, expanded, ..
            } => {
                f(alias);
                expanded.for_each_classifier(f);
            }
            StubType::Nested { outer, .. } => f(outer),
            StubType::TypeParameter { .. } => {}
        }
    }
}

impl fmt::Display for StubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubType::Classifier {
                classifier,
                type_arguments,
                ..
            }
            | StubType::Wrapper {
                classifier,
                type_arguments,
                ..
            } => {
                write!(f, "{classifier}")?;
                if !type_arguments.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in type_arguments.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
            }
            StubType::TypeParameter { key, .. } => f.write_str(&key.name)?,
            StubType::Nested { outer, name, .. } => write!(f, "{outer}.{name}")?,
            StubType::Abbreviation { alias, .. } => write!(f, "{alias}")?,
        }
        if self.is_nullable() {
            f.write_str("?")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArgument::Star => f.write_str("*"),
            TypeArgument::Projection { variance, ty } => match variance {
                Variance::Invariant => write!(f, "{ty}"),
                Variance::In => write!(f, "in {ty}"),
                Variance::Out => write!(f, "out {ty}"),
            },
        }
    }
}

#[cfg(test)]
mod tests;
