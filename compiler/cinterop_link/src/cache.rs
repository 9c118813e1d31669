//! Memoized declaration decoding.
//!
//! Every library declaration a link session touches goes through one
//! [`DeclarationCache`], keyed by `(ModuleId, DeclIndex)`. A declaration is
//! decoded the first time it is referenced and never again in the same
//! session.

use std::collections::hash_map::Entry;

use cinterop_ir::UniqId;
use cinterop_klib::{
    ClassDescriptor, DeclKind, FunctionDescriptor, PropertyDescriptor, TypeAliasDescriptor,
};
use rustc_hash::FxHashMap;

use crate::error::LinkError;
use crate::module::{DeclIndex, LoadedModule, ModuleId};

/// A decoded top-level declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declaration {
    Class(ClassDescriptor),
    Function(FunctionDescriptor),
    Property(PropertyDescriptor),
    TypeAlias(TypeAliasDescriptor),
}

impl Declaration {
    pub fn uniq_id(&self) -> UniqId {
        match self {
            Declaration::Class(c) => c.uniq_id,
            Declaration::Function(f) => f.uniq_id,
            Declaration::Property(p) => p.uniq_id,
            Declaration::TypeAlias(t) => t.uniq_id,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDescriptor> {
        match self {
            Declaration::Class(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DeclarationCache {
    entries: FxHashMap<(ModuleId, DeclIndex), Declaration>,
    decoded: usize,
}

impl DeclarationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The declaration at `index` of `module`, decoding it on first use.
    pub fn get_or_decode(
        &mut self,
        id: ModuleId,
        module: &LoadedModule,
        index: DeclIndex,
    ) -> Result<&Declaration, LinkError> {
        match self.entries.entry((id, index)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(slot) => {
                let declaration = decode(module, index)?;
                tracing::trace!(module = %module.name, %index, "decoded declaration");
                self.decoded += 1;
                Ok(slot.insert(declaration))
            }
        }
    }

    pub fn get(&self, id: ModuleId, index: DeclIndex) -> Option<&Declaration> {
        self.entries.get(&(id, index))
    }

    /// Number of decodes performed so far.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode(module: &LoadedModule, index: DeclIndex) -> Result<Declaration, LinkError> {
    let fragment = module.read_file(index.file)?;
    let decoder = fragment.decoder();
    let symbol = decoder.symbol(index.symbol)?;
    Ok(match symbol.kind {
        DeclKind::Class => Declaration::Class(decoder.class(symbol.index)?),
        DeclKind::Function => Declaration::Function(decoder.function(symbol.index)?),
        DeclKind::Property => Declaration::Property(decoder.property(symbol.index)?),
        DeclKind::TypeAlias => Declaration::TypeAlias(decoder.type_alias(symbol.index)?),
    })
}
