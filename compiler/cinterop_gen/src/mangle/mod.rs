//! Deterministic names for bound declarations.
//!
//! # Mangling Scheme
//!
//! A mangled name is a readable string that identifies a declaration:
//!
//! | Declaration | Mangled name |
//! |-------------|--------------|
//! | function `add(int, int)` | `kfun:#add(lang.Int;lang.Int)` |
//! | ObjC method | `kfun:pkg.NSView#initWithFrame:(...)` |
//! | struct | `kstruct:pkg.Point` |
//! | enum | `kenum:pkg.Color` |
//! | typedef | `ktypedef:pkg.size_t` |
//! | ObjC class / protocol | `kclass:pkg.NSView` / `kprotocol:pkg.NSCoding` |
//! | global | `kvar:#errno` |
//! | struct field | `kvar:pkg.Point#x` |
//! | enum constant | `kconst:#RED` |
//! | macro | `kmacro:#VERSION` |
//!
//! From it two further names are derived:
//!
//! - [`hash_mangle`]: the 64-bit [`UniqId`], CityHash64 with the public bit set.
//! - [`bridge_symbol`]: a C identifier for the glue function, `knibridge_`
//!   followed by the escaped mangled name.
//!
//! Both derivations are injective over their inputs up to hash collisions,
//! which are not detected.

mod cityhash;

use std::fmt::Write;

use cinterop_ir::{Classifier, ForwardKind, StubType, UniqId};

pub use cityhash::city_hash64;

/// Prefix of every glue function.
pub const BRIDGE_PREFIX: &str = "knibridge_";

/// A declaration to name.
#[derive(Clone, Copy, Debug)]
pub enum MangleTarget<'a> {
    Function {
        name: &'a str,
        parameters: &'a [StubType],
    },
    ObjCMethod {
        owner: &'a Classifier,
        selector: &'a str,
        is_class: bool,
        parameters: &'a [StubType],
    },
    Struct(&'a Classifier),
    Enum(&'a Classifier),
    Typedef(&'a Classifier),
    ObjCClass(&'a Classifier),
    ObjCProtocol(&'a Classifier),
    Global(&'a str),
    Field {
        owner: &'a Classifier,
        name: &'a str,
    },
    EnumConstant(&'a str),
    Macro(&'a str),
}

/// Produces mangled names. Stateless; kept as a type so call sites read
/// like the rest of the pipeline's builders.
#[derive(Clone, Copy, Debug, Default)]
pub struct InteropMangler;

impl InteropMangler {
    #[must_use]
    pub fn new() -> Self {
        InteropMangler
    }

    /// Readable mangled name of `target`.
    pub fn mangle(&self, target: &MangleTarget<'_>) -> String {
        let mut out = String::with_capacity(64);
        match *target {
            MangleTarget::Function { name, parameters } => {
                let _ = write!(out, "kfun:#{name}");
                push_parameters(&mut out, parameters);
            }
            MangleTarget::ObjCMethod {
                owner,
                selector,
                is_class,
                parameters,
            } => {
                let _ = write!(out, "kfun:{}", owner.fq_name());
                if is_class {
                    out.push_str(".Companion");
                }
                let _ = write!(out, "#{selector}");
                push_parameters(&mut out, parameters);
            }
            MangleTarget::Struct(c) => push_classifier(&mut out, "kstruct:", c),
            MangleTarget::Enum(c) => push_classifier(&mut out, "kenum:", c),
            MangleTarget::Typedef(c) => push_classifier(&mut out, "ktypedef:", c),
            MangleTarget::ObjCClass(c) => push_classifier(&mut out, "kclass:", c),
            MangleTarget::ObjCProtocol(c) => push_classifier(&mut out, "kprotocol:", c),
            MangleTarget::Global(name) => {
                let _ = write!(out, "kvar:#{name}");
            }
            MangleTarget::Field { owner, name } => {
                let _ = write!(out, "kvar:{}#{name}", owner.fq_name());
            }
            MangleTarget::EnumConstant(name) => {
                let _ = write!(out, "kconst:#{name}");
            }
            MangleTarget::Macro(name) => {
                let _ = write!(out, "kmacro:#{name}");
            }
        }
        out
    }

    /// Mangled name of a property accessor's glue, distinct from the property.
    pub fn accessor(&self, property_mangled: &str, setter: bool) -> String {
        if setter {
            format!("{property_mangled}#set")
        } else {
            format!("{property_mangled}#get")
        }
    }
}

fn push_classifier(out: &mut String, prefix: &str, classifier: &Classifier) {
    out.push_str(prefix);
    out.push_str(&classifier.fq_name());
}

fn push_parameters(out: &mut String, parameters: &[StubType]) {
    out.push('(');
    for (i, p) in parameters.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        let _ = write!(out, "{p}");
    }
    out.push(')');
}

/// 64-bit identity of a mangled name.
pub fn hash_mangle(mangled: &str) -> UniqId {
    UniqId::public(city_hash64(mangled.as_bytes()))
}

/// Identity of a forward-declaration placeholder, mangled as the kind of
/// declaration it stands for. `None` outside the reserved packages.
pub fn forward_declaration_id(classifier: &Classifier) -> Option<UniqId> {
    let target = match ForwardKind::from_package(classifier.package())? {
        ForwardKind::CStruct => MangleTarget::Struct(classifier),
        ForwardKind::ObjCClass => MangleTarget::ObjCClass(classifier),
        ForwardKind::ObjCProtocol => MangleTarget::ObjCProtocol(classifier),
    };
    Some(hash_mangle(&InteropMangler::new().mangle(&target)))
}

/// C identifier of the glue function for a mangled name.
pub fn bridge_symbol(mangled: &str) -> String {
    let mut out = String::with_capacity(BRIDGE_PREFIX.len() + mangled.len() + 16);
    out.push_str(BRIDGE_PREFIX);
    encode_identifier(&mut out, mangled);
    out
}

/// Escape everything outside `[A-Za-z0-9_]`.
///
/// Each escape is `$` followed by a two-letter uppercase code or by `u` and
/// six hex digits, so no escape is a prefix of another.
fn encode_identifier(out: &mut String, name: &str) {
    for c in name.chars() {
        match c {
            c if c.is_ascii_alphanumeric() || c == '_' => out.push(c),
            '$' => out.push_str("$DL"),
            '<' => out.push_str("$LT"),
            '>' => out.push_str("$GT"),
            ',' => out.push_str("$CM"),
            ':' => out.push_str("$CL"),
            ';' => out.push_str("$SC"),
            '#' => out.push_str("$HS"),
            '.' => out.push_str("$DT"),
            '(' => out.push_str("$LP"),
            ')' => out.push_str("$RP"),
            ' ' => out.push_str("$SP"),
            '?' => out.push_str("$QM"),
            '*' => out.push_str("$ST"),
            '/' => out.push_str("$SL"),
            '-' => out.push_str("$MN"),
            _ => {
                let _ = write!(out, "$u{:06x}", u32::from(c));
            }
        }
    }
}

#[cfg(test)]
mod tests;
