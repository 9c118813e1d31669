//! Fragment-local string and type tables.

use std::hash::Hash;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::proto::ProtoType;

/// Index into a fragment's [`StringTable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct StringId(u32);

/// Index into a fragment's [`TypeTable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct TypeId(u32);

impl StringId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        StringId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl TypeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        TypeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Deduplicated strings of one fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

/// Deduplicated type entries of one fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    types: Vec<ProtoType>,
}

impl TypeTable {
    pub fn get(&self, id: TypeId) -> Option<&ProtoType> {
        self.types.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Write side of a deduplicating table.
#[derive(Debug)]
pub(crate) struct TableBuilder<T> {
    items: Vec<T>,
    lookup: FxHashMap<T, u32>,
}

impl<T> Default for TableBuilder<T> {
    fn default() -> Self {
        TableBuilder {
            items: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }
}

impl<T> TableBuilder<T> {
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T: Clone + Eq + Hash> TableBuilder<T> {
    pub(crate) fn intern(&mut self, item: T) -> u32 {
        if let Some(&id) = self.lookup.get(&item) {
            return id;
        }
        let id = u32::try_from(self.items.len()).unwrap_or(u32::MAX);
        self.lookup.insert(item.clone(), id);
        self.items.push(item);
        id
    }
}

impl TableBuilder<String> {
    pub(crate) fn intern_str(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.lookup.get(s) {
            return StringId(id);
        }
        StringId(self.intern(s.to_owned()))
    }

    pub(crate) fn finish(self) -> StringTable {
        StringTable {
            strings: self.items,
        }
    }
}

impl TableBuilder<ProtoType> {
    pub(crate) fn intern_type(&mut self, ty: ProtoType) -> TypeId {
        TypeId(self.intern(ty))
    }

    pub(crate) fn finish(self) -> TypeTable {
        TypeTable { types: self.items }
    }
}
