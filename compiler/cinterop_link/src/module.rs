//! Modules loaded into a link session.
//!
//! | Kind | Declarations | `file_count` |
//! |------|--------------|--------------|
//! | `Library` | serialized fragments, decoded on demand | one per fragment |
//! | `Source` | in-memory descriptors being compiled now | 0 |
//! | `ForwardDeclarations` | placeholders only | 0 |
//!
//! Every lookup below is relative to one module: a file index names a
//! fragment of that module, and symbol, type, string and body indices are
//! local to that fragment.

use std::fmt;

use cinterop_klib::{
    BodyId, ConstantValue, Library, PackageDescriptor, PackageFragment, StringId, SymbolEntry,
    SymbolId, TypeDescriptor, TypeId,
};

use crate::error::LinkError;

/// Position of a module in its link session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ModuleId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A top-level declaration of a library module: fragment plus symbol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeclIndex {
    pub file: u32,
    pub symbol: SymbolId,
}

impl DeclIndex {
    pub const fn new(file: u32, symbol: SymbolId) -> Self {
        DeclIndex { file, symbol }
    }
}

impl fmt::Display for DeclIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file {} symbol {}", self.file, self.symbol.raw())
    }
}

#[derive(Debug)]
pub enum ModuleKind {
    Library(Library),
    Source(Vec<PackageDescriptor>),
    ForwardDeclarations,
}

#[derive(Debug)]
pub struct LoadedModule {
    pub name: String,
    pub kind: ModuleKind,
}

impl LoadedModule {
    /// Whether declarations of this module are read from a container.
    pub fn has_serialized_form(&self) -> bool {
        matches!(self.kind, ModuleKind::Library(_))
    }

    pub fn file_count(&self) -> usize {
        match &self.kind {
            ModuleKind::Library(library) => library.fragment_count(),
            ModuleKind::Source(_) | ModuleKind::ForwardDeclarations => 0,
        }
    }

    fn library(&self) -> Result<&Library, LinkError> {
        match &self.kind {
            ModuleKind::Library(library) => Ok(library),
            ModuleKind::Source(_) | ModuleKind::ForwardDeclarations => {
                Err(LinkError::NoSerializedForm {
                    module: self.name.clone(),
                })
            }
        }
    }

    pub fn read_file(&self, file: u32) -> Result<&PackageFragment, LinkError> {
        Ok(self.library()?.fragment(file as usize)?)
    }

    pub fn read_symbol(&self, file: u32, symbol: SymbolId) -> Result<&SymbolEntry, LinkError> {
        Ok(self.read_file(file)?.decoder().symbol(symbol)?)
    }

    pub fn read_type(&self, file: u32, ty: TypeId) -> Result<TypeDescriptor, LinkError> {
        Ok(self.read_file(file)?.decoder().ty(ty)?)
    }

    pub fn read_string(&self, file: u32, string: StringId) -> Result<&str, LinkError> {
        Ok(self.read_file(file)?.decoder().string(string)?)
    }

    pub fn read_body(&self, file: u32, body: BodyId) -> Result<&ConstantValue, LinkError> {
        Ok(self.read_file(file)?.decoder().body(body)?)
    }
}
