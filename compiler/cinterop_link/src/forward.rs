//! Forward-declaration identities and their resolution.
//!
//! ```text
//!              real class found in a library
//! Unresolved ─────────────────────────────────▶ Resolved(target)
//!     │
//!     └── still unresolved when the link finishes: emitted as an opaque,
//!         member-less class in the forward declarations pseudo-file
//! ```
//!
//! There is no failure state. A placeholder is resolved at most once per
//! session; later lookups read the recorded target.

use cinterop_ir::{is_forward_declaration_package, ForwardKind, UniqId};
use cinterop_klib::{ClassDescriptor, ClassDescriptorKind, DeclFlags, PackageDescriptor};
use rustc_hash::FxHashMap;

/// Source name of the file that holds unresolved placeholders.
pub const FORWARD_DECLARATIONS_FILE: &str = "forward declarations pseudo-file";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardState {
    Unresolved,
    Resolved(UniqId),
}

/// Write-once remap table from placeholder identity to real identity.
#[derive(Debug, Default)]
pub struct ForwardDeclarations {
    remap: FxHashMap<UniqId, UniqId>,
    /// Serialized name of every resolution target.
    names: FxHashMap<UniqId, String>,
}

impl ForwardDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, placeholder: UniqId) -> ForwardState {
        self.remap
            .get(&placeholder)
            .map_or(ForwardState::Unresolved, |&target| {
                ForwardState::Resolved(target)
            })
    }

    pub fn get(&self, placeholder: UniqId) -> Option<UniqId> {
        self.remap.get(&placeholder).copied()
    }

    /// Serialized name of a resolution target.
    pub fn target_name(&self, target: UniqId) -> Option<&str> {
        self.names.get(&target).map(String::as_str)
    }

    /// Record `placeholder → target` and return the recorded target.
    ///
    /// The first recording wins; a later one for the same placeholder is
    /// ignored.
    pub fn record(&mut self, placeholder: UniqId, target: UniqId, name: &str) -> UniqId {
        if let Some(&existing) = self.remap.get(&placeholder) {
            if existing != target {
                tracing::warn!(
                    %placeholder,
                    %existing,
                    ignored = %target,
                    "forward declaration already resolved elsewhere"
                );
            }
            return existing;
        }
        self.remap.insert(placeholder, target);
        self.names.insert(target, name.to_owned());
        target
    }

    pub fn len(&self) -> usize {
        self.remap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remap.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UniqId, UniqId)> + '_ {
        self.remap.iter().map(|(&from, &to)| (from, to))
    }
}

/// Split a serialized class name into its dotted package and relative name.
///
/// `cnames/structs/Opaque` → (`cnames.structs`, `Opaque`).
pub fn split_serialized(name: &str) -> (String, &str) {
    match name.rsplit_once('/') {
        Some((package, relative)) => (package.replace('/', "."), relative),
        None => (String::new(), name),
    }
}

/// Whether a serialized class name lives in a forward-declaration package.
pub fn is_placeholder_name(name: &str) -> bool {
    is_forward_declaration_package(&split_serialized(name).0)
}

/// Kind of placeholder a serialized class name is, if it names one of the
/// forward-declaration packages.
pub fn placeholder_kind(name: &str) -> Option<ForwardKind> {
    ForwardKind::from_package(&split_serialized(name).0)
}

/// Descriptor kind a real class needs to stand in for a placeholder.
pub fn target_class_kind(kind: ForwardKind) -> ClassDescriptorKind {
    match kind {
        ForwardKind::CStruct | ForwardKind::ObjCClass => ClassDescriptorKind::Class,
        ForwardKind::ObjCProtocol => ClassDescriptorKind::Interface,
    }
}

/// Whether a class whose simple name is `candidate` can stand in for a
/// placeholder named `simple`.
///
/// A protocol bound next to a class of the same name carries a `Protocol`
/// suffix, so `objcnames.protocols.NSObject` also matches
/// `NSObjectProtocol`.
pub fn is_candidate_name(kind: ForwardKind, simple: &str, candidate: &str) -> bool {
    candidate == simple
        || (kind == ForwardKind::ObjCProtocol
            && candidate.strip_suffix("Protocol") == Some(simple))
}

/// Last segment of a serialized class name.
pub fn simple_name(name: &str) -> &str {
    let relative = split_serialized(name).1;
    relative.rsplit('.').next().unwrap_or(relative)
}

/// Unresolved placeholders, grouped by package.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardDeclarationFile {
    pub packages: Vec<PackageDescriptor>,
}

impl ForwardDeclarationFile {
    pub const NAME: &'static str = FORWARD_DECLARATIONS_FILE;

    pub(crate) fn from_placeholders<'a>(
        placeholders: impl IntoIterator<Item = (&'a str, UniqId)>,
    ) -> Self {
        let mut packages: Vec<PackageDescriptor> = Vec::new();
        for (name, uniq_id) in placeholders {
            let (package, _) = split_serialized(name);
            let index = match packages.iter().position(|p| p.fq_name == package) {
                Some(index) => index,
                None => {
                    packages.push(PackageDescriptor::new(package));
                    packages.len() - 1
                }
            };
            packages[index].classes.push(opaque_class(name, uniq_id));
        }
        ForwardDeclarationFile { packages }
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.packages.iter().flat_map(|p| p.classes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn opaque_class(name: &str, uniq_id: UniqId) -> ClassDescriptor {
    ClassDescriptor {
        name: name.to_owned(),
        kind: ClassDescriptorKind::Opaque,
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
