//! Reserved packages for forward-declared foreign types.
//!
//! A type referenced but not defined by the index is bound into one of
//! these pseudo-packages. The linker later swaps the placeholder for the
//! real class once a module defining it is loaded.

use crate::types::Classifier;

/// Package of forward-declared C structs.
pub const CNAMES_STRUCTS: &str = "cnames.structs";

/// Package of forward-declared Objective-C classes.
pub const OBJCNAMES_CLASSES: &str = "objcnames.classes";

/// Package of forward-declared Objective-C protocols.
pub const OBJCNAMES_PROTOCOLS: &str = "objcnames.protocols";

const CNAMES_PREFIX: &str = "cnames.";
const OBJCNAMES_PREFIX: &str = "objcnames.";

/// Whether `package` is one of the forward-declaration namespaces.
pub fn is_forward_declaration_package(package: &str) -> bool {
    package.starts_with(CNAMES_PREFIX) || package.starts_with(OBJCNAMES_PREFIX)
}

/// Kind of foreign type a placeholder stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ForwardKind {
    CStruct,
    ObjCClass,
    ObjCProtocol,
}

impl ForwardKind {
    pub const ALL: [ForwardKind; 3] = [
        ForwardKind::CStruct,
        ForwardKind::ObjCClass,
        ForwardKind::ObjCProtocol,
    ];

    pub const fn package(self) -> &'static str {
        match self {
            ForwardKind::CStruct => CNAMES_STRUCTS,
            ForwardKind::ObjCClass => OBJCNAMES_CLASSES,
            ForwardKind::ObjCProtocol => OBJCNAMES_PROTOCOLS,
        }
    }

    /// Kind whose package is exactly `package`, if any.
    pub fn from_package(package: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.package() == package)
    }

    /// Placeholder classifier for the foreign type `name`.
    pub fn classifier(self, name: &str) -> Classifier {
        Classifier::new(self.package(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_packages_are_recognized() {
        assert!(is_forward_declaration_package(CNAMES_STRUCTS));
        assert!(is_forward_declaration_package(OBJCNAMES_CLASSES));
        assert!(is_forward_declaration_package(OBJCNAMES_PROTOCOLS));
        assert!(!is_forward_declaration_package("cnamesx.structs"));
        assert!(!is_forward_declaration_package("sqlite"));
    }

    #[test]
    fn kind_round_trips_through_package() {
        for kind in ForwardKind::ALL {
            assert_eq!(ForwardKind::from_package(kind.package()), Some(kind));
        }
        assert_eq!(ForwardKind::from_package("cnames"), None);
    }

    #[test]
    fn placeholder_classifier() {
        let c = ForwardKind::CStruct.classifier("Opaque");
        assert_eq!(c.fq_name(), "cnames.structs.Opaque");
    }
}
