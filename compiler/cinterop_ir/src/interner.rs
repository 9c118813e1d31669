//! Per-run interning tables.
//!
//! Both tables are owned by one binding run. Nothing here is global, so two
//! runs in the same process never share ids or names.

use rustc_hash::FxHashMap;

use crate::index::StructId;
use crate::types::TypeParamKey;

/// Assigns dense ids to type parameters, keyed by their identity.
///
/// Interning the same key twice yields the same id, no matter which
/// declaration it is reached from.
#[derive(Debug, Default)]
pub struct TypeParameterInterner {
    ids: FxHashMap<TypeParamKey, u32>,
}

impl TypeParameterInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, key: &TypeParamKey) -> u32 {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = u32::try_from(self.ids.len()).unwrap_or(u32::MAX);
        self.ids.insert(key.clone(), id);
        id
    }

    pub fn get(&self, key: &TypeParamKey) -> Option<u32> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Synthetic names for anonymous structs: `anonymousStruct1`, `anonymousStruct2`, ...
///
/// Names are minted in first-encounter order. A struct that already has a
/// name keeps it.
#[derive(Debug, Default)]
pub struct AnonymousStructNames {
    names: FxHashMap<StructId, String>,
    order: Vec<StructId>,
}

impl AnonymousStructNames {
    pub const PREFIX: &'static str = "anonymousStruct";

    pub fn new() -> Self {
        Self::default()
    }

    /// Name of `id`, minting the next one on first encounter.
    pub fn name_for(&mut self, id: StructId) -> &str {
        let next = self.names.len() + 1;
        let order = &mut self.order;
        self.names.entry(id).or_insert_with(|| {
            order.push(id);
            format!("{}{next}", Self::PREFIX)
        })
    }

    pub fn get(&self, id: StructId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Assigned names in minting order.
    pub fn iter(&self) -> impl Iterator<Item = (StructId, &str)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.names.get(id).map(|n| (*id, n.as_str())))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn anonymous_names_follow_first_encounter() {
        let mut names = AnonymousStructNames::new();
        let a = StructId::new(4);
        let b = StructId::new(1);
        let c = StructId::new(9);

        assert_eq!(names.name_for(a), "anonymousStruct1");
        assert_eq!(names.name_for(b), "anonymousStruct2");
        assert_eq!(names.name_for(a), "anonymousStruct1");
        assert_eq!(names.name_for(b), "anonymousStruct2");
        assert_eq!(names.name_for(c), "anonymousStruct3");

        let listed: Vec<_> = names.iter().map(|(id, n)| (id, n.to_owned())).collect();
        assert_eq!(
            listed,
            vec![
                (a, "anonymousStruct1".to_owned()),
                (b, "anonymousStruct2".to_owned()),
                (c, "anonymousStruct3".to_owned()),
            ]
        );
    }

    #[test]
    fn type_parameter_ids_are_stable() {
        let mut interner = TypeParameterInterner::new();
        let t = TypeParamKey::new("pkg.Box", "T");
        let u = TypeParamKey::new("pkg.Box", "U");

        assert_eq!(interner.intern(&t), 0);
        assert_eq!(interner.intern(&u), 1);
        assert_eq!(interner.intern(&t), 0);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.get(&u), Some(1));
    }
}
