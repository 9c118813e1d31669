//! C spellings of index types, for glue signatures and casts.

use cinterop_ir::{CType, NativeIndex, StructId};

/// A type with no C spelling: an indexer `Unsupported` type or an anonymous
/// struct no typedef names.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("type `{0}` has no C spelling")]
pub struct Unspellable(pub String);

#[derive(Clone, Copy, Debug)]
pub(crate) struct CSpeller<'a> {
    index: &'a NativeIndex,
}

impl<'a> CSpeller<'a> {
    pub(crate) fn new(index: &'a NativeIndex) -> Self {
        CSpeller { index }
    }

    /// `struct Foo`, or the first typedef naming an anonymous struct.
    pub(crate) fn record_spelling(&self, id: StructId) -> Option<String> {
        let decl = self.index.struct_decl(id);
        if !decl.is_anonymous {
            return Some(format!("{} {}", decl.kind.keyword(), decl.spelling));
        }
        self.index
            .typedefs
            .iter()
            .find(|t| matches!(t.aliased.unqualified(), CType::Record(r) if *r == id))
            .map(|t| t.name.clone())
    }

    /// Abstract declarator: the type alone (`const char *`).
    pub(crate) fn spell(&self, ty: &CType) -> Result<String, Unspellable> {
        self.declare(ty, "")
    }

    /// Full declarator of `name` with type `ty` (`int (*cb)(int)`).
    pub(crate) fn declare(&self, ty: &CType, name: &str) -> Result<String, Unspellable> {
        match ty {
            CType::Void => Ok(join("void", name)),
            CType::Bool => Ok(join("_Bool", name)),
            CType::Int { spelling, .. } | CType::Float { spelling, .. } => Ok(join(spelling, name)),
            CType::Pointer(pointee) => match pointee.unqualified() {
                CType::ConstArray { .. } | CType::IncompleteArray(_) => {
                    self.declare(pointee, &format!("(*{name})"))
                }
                _ => self.declare(pointee, &format!("*{name}")),
            },
            CType::Const(inner) => match inner.as_ref() {
                CType::Pointer(pointee) => self.declare(pointee, &format!("* const {name}")),
                other => Ok(format!("const {}", self.declare(other, name)?)),
            },
            CType::ConstArray { element, length } => {
                self.declare(element, &format!("{name}[{length}]"))
            }
            CType::IncompleteArray(element) => self.declare(element, &format!("{name}[]")),
            CType::Record(id) => {
                let spelling = self
                    .record_spelling(*id)
                    .ok_or_else(|| Unspellable(self.index.struct_decl(*id).spelling.clone()))?;
                Ok(join(&spelling, name))
            }
            CType::Enum(id) => {
                let e = self.index.enum_def(*id);
                if e.is_anonymous {
                    self.declare(&e.base_type, name)
                } else {
                    Ok(join(&format!("enum {}", e.spelling), name))
                }
            }
            CType::Typedef(id) => Ok(join(&self.index.typedef(*id).name, name)),
            CType::FunctionPointer(f) => {
                let mut params = f
                    .parameters
                    .iter()
                    .map(|p| self.spell(p))
                    .collect::<Result<Vec<_>, _>>()?;
                if f.variadic {
                    params.push("...".to_owned());
                }
                let params = if params.is_empty() {
                    "void".to_owned()
                } else {
                    params.join(", ")
                };
                self.declare(&f.return_type, &format!("(*{name})({params})"))
            }
            CType::ObjCObjectPointer(id) => Ok(join(
                &self.index.objc_class(*id).name,
                &format!("*{name}"),
            )),
            CType::ObjCId { .. } => Ok(join("id", name)),
            CType::Unsupported(spelling) => Err(Unspellable(spelling.clone())),
        }
    }
}

fn join(base: &str, declarator: &str) -> String {
    if declarator.is_empty() {
        base.to_owned()
    } else {
        format!("{base} {declarator}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinterop_ir::{FunctionType, RecordKind, StructDecl, TypedefDef};
    use pretty_assertions::assert_eq;

    fn index() -> NativeIndex {
        let mut index = NativeIndex::default();
        index.structs.push(StructDecl {
            spelling: "Point".into(),
            kind: RecordKind::Struct,
            is_anonymous: false,
            def: None,
        });
        index.structs.push(StructDecl {
            spelling: String::new(),
            kind: RecordKind::Struct,
            is_anonymous: true,
            def: None,
        });
        index.typedefs.push(TypedefDef {
            name: "Pair".into(),
            aliased: CType::Record(StructId::new(1)),
        });
        index
    }

    fn char_ty() -> CType {
        CType::int(1, true, "char")
    }

    #[test]
    fn pointers_and_qualifiers() {
        let index = index();
        let s = CSpeller::new(&index);
        let c_string = CType::pointer(CType::constant(char_ty()));
        assert_eq!(s.spell(&c_string).unwrap(), "const char *");
        assert_eq!(s.declare(&c_string, "p0").unwrap(), "const char *p0");
        let pp = CType::pointer(CType::pointer(CType::Void));
        assert_eq!(s.declare(&pp, "out").unwrap(), "void **out");
        let const_ptr = CType::constant(CType::pointer(char_ty()));
        assert_eq!(s.declare(&const_ptr, "p").unwrap(), "char * const p");
    }

    #[test]
    fn records_use_tag_or_typedef() {
        let index = index();
        let s = CSpeller::new(&index);
        assert_eq!(s.spell(&CType::Record(StructId::new(0))).unwrap(), "struct Point");
        assert_eq!(s.spell(&CType::Record(StructId::new(1))).unwrap(), "Pair");
    }

    #[test]
    fn function_pointer_declarator() {
        let index = index();
        let s = CSpeller::new(&index);
        let cb = CType::FunctionPointer(Box::new(FunctionType {
            return_type: CType::int(4, true, "int"),
            parameters: vec![CType::int(4, true, "int")],
            variadic: false,
        }));
        assert_eq!(s.declare(&cb, "cb").unwrap(), "int (*cb)(int)");
        let arr = CType::ConstArray {
            element: Box::new(CType::int(4, true, "int")),
            length: 4,
        };
        assert_eq!(s.declare(&arr, "v").unwrap(), "int v[4]");
    }

    #[test]
    fn unsupported_is_unspellable() {
        let index = index();
        let s = CSpeller::new(&index);
        let err = s.spell(&CType::Unsupported("__int128".into())).unwrap_err();
        assert_eq!(err.to_string(), "type `__int128` has no C spelling");
    }
}
