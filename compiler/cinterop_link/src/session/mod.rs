//! The link session: loaded modules, decoded declarations, resolutions.
//!
//! A session is an explicit context object. Two sessions never share a
//! cache or a remap table.
//!
//! # Resolving a class reference
//!
//! ```text
//! reference in cnames.* / objcnames.* ?
//!   no  → itself
//!   yes → already resolved?            yes → recorded target
//!         missed with no module added since? yes → placeholder
//!         search loaded modules by simple name and kind
//!         (reserved packages skipped)
//!           found in a library   → record placeholder → real, return real
//!           found in source only → log, return placeholder
//!           not found            → return placeholder
//! ```
//!
//! Structs and Objective-C classes resolve to classes; protocols resolve to
//! interfaces. Only a successful resolution is recorded. A miss is
//! remembered until another module is loaded, so a placeholder that is still
//! unresolved is searched for again once there is somewhere new to look.

use std::collections::BTreeSet;
use std::path::Path;

use cinterop_ir::{is_forward_declaration_package, ForwardKind, UniqId};
use cinterop_klib::{
    DeclKind, Library, PackageDescriptor, SymbolId, TypeArgumentDescriptor, TypeDescriptor,
    TypeKind,
};
use rustc_hash::FxHashMap;

use crate::cache::{Declaration, DeclarationCache};
use crate::error::LinkError;
use crate::forward::{
    is_candidate_name, placeholder_kind, simple_name, target_class_kind, ForwardDeclarationFile,
    ForwardDeclarations, ForwardState,
};
use crate::module::{DeclIndex, LoadedModule, ModuleId, ModuleKind};
use crate::walk::{package_types, package_types_mut};

/// Where a class search found its match.
enum Found {
    Deserialized { uniq_id: UniqId, name: String },
    SourceOnly { module: String },
}

pub struct LinkSession {
    modules: Vec<LoadedModule>,
    cache: DeclarationCache,
    forward: ForwardDeclarations,
    /// Placeholders referenced but not resolved yet, by identity.
    pending: FxHashMap<UniqId, String>,
    /// Module count at each placeholder's last fruitless search.
    misses: FxHashMap<UniqId, usize>,
    searches: usize,
}

impl Default for LinkSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkSession {
    /// Module that owns the forward-declaration placeholders.
    pub const FORWARD_MODULE: ModuleId = ModuleId::new(0);

    pub fn new() -> Self {
        LinkSession {
            modules: vec![LoadedModule {
                name: "<forward declarations>".to_owned(),
                kind: ModuleKind::ForwardDeclarations,
            }],
            cache: DeclarationCache::new(),
            forward: ForwardDeclarations::new(),
            pending: FxHashMap::default(),
            misses: FxHashMap::default(),
            searches: 0,
        }
    }

    // ── Modules ────────────────────────────────────────────────────

    fn push_module(&mut self, module: LoadedModule) -> ModuleId {
        let id = ModuleId::new(u32::try_from(self.modules.len()).unwrap_or(u32::MAX));
        tracing::debug!(module = %module.name, %id, "loaded module");
        self.modules.push(module);
        id
    }

    pub fn add_library(&mut self, library: Library) -> ModuleId {
        self.push_module(LoadedModule {
            name: library.module_name().to_owned(),
            kind: ModuleKind::Library(library),
        })
    }

    pub fn open_library(&mut self, path: &Path) -> Result<ModuleId, LinkError> {
        Ok(self.add_library(Library::open(path)?))
    }

    /// Register declarations compiled in this session. They have no
    /// serialized form and never become resolution targets.
    pub fn add_source_module(
        &mut self,
        name: impl Into<String>,
        packages: Vec<PackageDescriptor>,
    ) -> ModuleId {
        self.push_module(LoadedModule {
            name: name.into(),
            kind: ModuleKind::Source(packages),
        })
    }

    pub fn module(&self, id: ModuleId) -> Result<&LoadedModule, LinkError> {
        self.modules
            .get(id.index())
            .ok_or(LinkError::UnknownModule(id))
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// A library declaration, decoded on first reference.
    pub fn declaration(&mut self, id: ModuleId, index: DeclIndex) -> Result<&Declaration, LinkError> {
        let module = self
            .modules
            .get(id.index())
            .ok_or(LinkError::UnknownModule(id))?;
        self.cache.get_or_decode(id, module, index)
    }

    // ── Resolution ─────────────────────────────────────────────────

    /// Identity a class reference links to.
    ///
    /// `name` is the serialized class name carried by the reference.
    pub fn resolve_class(&mut self, name: &str, uniq_id: UniqId) -> Result<UniqId, LinkError> {
        let Some(kind) = placeholder_kind(name) else {
            return Ok(uniq_id);
        };
        if let Some(target) = self.forward.get(uniq_id) {
            return Ok(target);
        }
        if self.misses.get(&uniq_id) == Some(&self.modules.len()) {
            return Ok(uniq_id);
        }

        self.searches += 1;
        match self.find_class(kind, simple_name(name))? {
            Some(Found::Deserialized {
                uniq_id: target,
                name: real,
            }) => {
                tracing::debug!(placeholder = name, real = %real, %target, "resolved forward declaration");
                self.pending.remove(&uniq_id);
                self.misses.remove(&uniq_id);
                Ok(self.forward.record(uniq_id, target, &real))
            }
            Some(Found::SourceOnly { module }) => {
                tracing::warn!(
                    placeholder = name,
                    module = %module,
                    "forward declaration matches a class with no serialized form"
                );
                self.miss(uniq_id, name);
                Ok(uniq_id)
            }
            None => {
                tracing::debug!(placeholder = name, "forward declaration not found");
                self.miss(uniq_id, name);
                Ok(uniq_id)
            }
        }
    }

    fn miss(&mut self, placeholder: UniqId, name: &str) {
        self.pending.insert(placeholder, name.to_owned());
        self.misses.insert(placeholder, self.modules.len());
    }

    fn find_class(&mut self, kind: ForwardKind, simple: &str) -> Result<Option<Found>, LinkError> {
        let wanted = target_class_kind(kind);
        for (i, module) in self.modules.iter().enumerate() {
            let id = ModuleId::new(u32::try_from(i).unwrap_or(u32::MAX));
            match &module.kind {
                ModuleKind::ForwardDeclarations => {}
                ModuleKind::Source(packages) => {
                    let found = packages
                        .iter()
                        .filter(|p| !is_forward_declaration_package(&p.fq_name))
                        .flat_map(|p| p.classes.iter())
                        .any(|c| {
                            c.kind == wanted && is_candidate_name(kind, simple, simple_name(&c.name))
                        });
                    if found {
                        return Ok(Some(Found::SourceOnly {
                            module: module.name.clone(),
                        }));
                    }
                }
                ModuleKind::Library(library) => {
                    for file in 0..library.fragment_count() {
                        let fragment = library.fragment(file)?;
                        if is_forward_declaration_package(&fragment.fq_name) {
                            continue;
                        }
                        let decoder = fragment.decoder();
                        for (s, symbol) in fragment.symbols.iter().enumerate() {
                            if symbol.kind != DeclKind::Class
                                || !is_candidate_name(
                                    kind,
                                    simple,
                                    simple_name(decoder.string(symbol.name)?),
                                )
                            {
                                continue;
                            }
                            let index = DeclIndex::new(
                                u32::try_from(file).unwrap_or(u32::MAX),
                                SymbolId::new(u32::try_from(s).unwrap_or(u32::MAX)),
                            );
                            let declaration = self.cache.get_or_decode(id, module, index)?;
                            if let Some(class) =
                                declaration.as_class().filter(|c| c.kind == wanted)
                            {
                                return Ok(Some(Found::Deserialized {
                                    uniq_id: class.uniq_id,
                                    name: class.name.clone(),
                                }));
                            }
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    /// Rewrite every placeholder in `ty` that resolves.
    pub fn resolve_type(&mut self, ty: &mut TypeDescriptor) -> Result<(), LinkError> {
        if let TypeKind::Class {
            name,
            uniq_id: Some(id),
        } = &mut ty.kind
        {
            let target = self.resolve_class(name, *id)?;
            if target != *id {
                *id = target;
                if let Some(real) = self.forward.target_name(target) {
                    real.clone_into(name);
                }
            }
        }
        for argument in &mut ty.arguments {
            if let TypeArgumentDescriptor::Projection { ty, .. } = argument {
                self.resolve_type(ty)?;
            }
        }
        if let Some(abbreviation) = &mut ty.abbreviation {
            self.resolve_type(abbreviation)?;
        }
        Ok(())
    }

    pub fn state(&self, placeholder: UniqId) -> ForwardState {
        self.forward.state(placeholder)
    }

    pub fn forward_declarations(&self) -> &ForwardDeclarations {
        &self.forward
    }

    /// Cross-module searches run so far.
    pub fn search_count(&self) -> usize {
        self.searches
    }

    /// Declarations decoded so far.
    pub fn decoded_count(&self) -> usize {
        self.cache.decoded()
    }

    // ── Finish ─────────────────────────────────────────────────────

    /// Decode every library, remap every reference and collect the
    /// placeholders nothing resolved.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn finish(mut self) -> Result<LinkedProgram, LinkError> {
        let mut modules = Vec::with_capacity(self.modules.len());
        for i in 0..self.modules.len() {
            let id = ModuleId::new(u32::try_from(i).unwrap_or(u32::MAX));
            let Some(mut linked) = self.collect_module(id)? else {
                continue;
            };
            for package in &mut linked.packages {
                package_types_mut(package, &mut |ty| self.resolve_type(ty))?;
            }
            modules.push(linked);
        }

        let mut unresolved: Vec<(UniqId, String)> = self
            .pending
            .drain()
            .filter(|(id, _)| self.forward.get(*id).is_none())
            .collect();
        unresolved.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        for (id, name) in &unresolved {
            tracing::info!(placeholder = %name, uniq_id = %id, "forward declaration unresolved; emitting opaque class");
        }
        let forward_declarations = ForwardDeclarationFile::from_placeholders(
            unresolved.iter().map(|(id, name)| (name.as_str(), *id)),
        );

        tracing::info!(
            modules = modules.len(),
            resolved = self.forward.len(),
            unresolved = unresolved.len(),
            searches = self.searches,
            decoded = self.cache.decoded(),
            "link finished"
        );
        Ok(LinkedProgram {
            modules,
            forward_declarations,
        })
    }

    fn collect_module(&mut self, id: ModuleId) -> Result<Option<LinkedModule>, LinkError> {
        let module = self.module(id)?;
        let name = module.name.clone();
        let files: Vec<(String, usize)> = match &module.kind {
            ModuleKind::ForwardDeclarations => return Ok(None),
            ModuleKind::Source(packages) => {
                return Ok(Some(LinkedModule {
                    name,
                    packages: packages.clone(),
                }))
            }
            ModuleKind::Library(library) => (0..library.fragment_count())
                .map(|file| {
                    library
                        .fragment(file)
                        .map(|f| (f.fq_name.clone(), f.symbols.len()))
                })
                .collect::<Result<_, _>>()?,
        };

        let mut packages = Vec::with_capacity(files.len());
        for (file, (fq_name, symbols)) in files.into_iter().enumerate() {
            let file = u32::try_from(file).unwrap_or(u32::MAX);
            let mut package = PackageDescriptor::new(fq_name);
            for s in 0..symbols {
                let index =
                    DeclIndex::new(file, SymbolId::new(u32::try_from(s).unwrap_or(u32::MAX)));
                match self.declaration(id, index)?.clone() {
                    Declaration::Class(c) => package.classes.push(c),
                    Declaration::Function(f) => package.functions.push(f),
                    Declaration::Property(p) => package.properties.push(p),
                    Declaration::TypeAlias(t) => package.type_aliases.push(t),
                }
            }
            packages.push(package);
        }
        Ok(Some(LinkedModule { name, packages }))
    }
}

// ── Result ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedModule {
    pub name: String,
    pub packages: Vec<PackageDescriptor>,
}

/// Every loaded module with references remapped, plus the placeholders
/// that stayed unresolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedProgram {
    pub modules: Vec<LinkedModule>,
    pub forward_declarations: ForwardDeclarationFile,
}

impl LinkedProgram {
    pub fn module(&self, name: &str) -> Option<&LinkedModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Every class identity referenced from a type in any module.
    pub fn referenced_uniq_ids(&self) -> BTreeSet<UniqId> {
        let mut ids = Vec::new();
        for package in self.modules.iter().flat_map(|m| m.packages.iter()) {
            let _ = package_types(package, &mut |ty| {
                ty.uniq_ids(&mut ids);
                Ok::<(), std::convert::Infallible>(())
            });
        }
        ids.into_iter().collect()
    }
}

#[cfg(test)]
mod tests;
