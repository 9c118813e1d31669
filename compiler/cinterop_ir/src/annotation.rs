//! ABI annotations attached to stubs.
//!
//! Annotations carry everything the host compiler needs to call into native
//! code without seeing a header: the glue symbol, marshaling mode, bit-field
//! layout and ownership conventions.

use crate::types::{Classifier, BUILTINS_PACKAGE, RUNTIME_PACKAGE};

/// Package of compiler-internal interop annotations.
pub const INTERNAL_PACKAGE: &str = "cinterop.internal";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationStub {
    /// Call through the C glue function `id`.
    CCall { id: String },
    /// Marshal a parameter as a NUL-terminated UTF-8 string.
    CString,
    /// Marshal a parameter as a NUL-terminated UTF-16 string.
    WCString,
    /// Pass a struct by value through a pointer to a copy.
    CValue,
    /// Non-default calling convention (`ffi-variadic`).
    CallingConvention { id: String },
    ReturnsRetained,
    ConsumesReceiver,
    Consumed,
    /// Bit-field read; `offset` in bits.
    ReadBits { offset: u64, size: u32, signed: bool },
    WriteBits { offset: u64, size: u32 },
    /// Field access at a byte offset.
    GetMemberAt { offset: u64, by_value: bool },
    SetMemberAt { offset: u64 },
    CStruct { spelling: String },
    ObjCMethod {
        selector: String,
        encoding: String,
        is_variadic: bool,
    },
    ExternalObjCClass,
    Deprecated { message: String },
}

/// Literal value of an annotation argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationValue {
    String(String),
    Long(i64),
    Int(i32),
    Boolean(bool),
}

impl AnnotationStub {
    /// Classifier of the annotation class.
    pub fn classifier(&self) -> Classifier {
        let (package, name) = match self {
            AnnotationStub::CCall { .. } => (INTERNAL_PACKAGE, "CCall"),
            AnnotationStub::CString => (INTERNAL_PACKAGE, "CCall.CString"),
            AnnotationStub::WCString => (INTERNAL_PACKAGE, "CCall.WCString"),
            AnnotationStub::CValue => (INTERNAL_PACKAGE, "CCall.CValue"),
            AnnotationStub::CallingConvention { .. } => {
                (INTERNAL_PACKAGE, "CCall.CallingConvention")
            }
            AnnotationStub::ReturnsRetained => (INTERNAL_PACKAGE, "CCall.ReturnsRetained"),
            AnnotationStub::ConsumesReceiver => (INTERNAL_PACKAGE, "CCall.ConsumesReceiver"),
            AnnotationStub::Consumed => (INTERNAL_PACKAGE, "CCall.Consumed"),
            AnnotationStub::ReadBits { .. } => (INTERNAL_PACKAGE, "CStruct.BitField.ReadBits"),
            AnnotationStub::WriteBits { .. } => (INTERNAL_PACKAGE, "CStruct.BitField.WriteBits"),
            AnnotationStub::GetMemberAt { .. } => (INTERNAL_PACKAGE, "CStruct.MemberAt.Get"),
            AnnotationStub::SetMemberAt { .. } => (INTERNAL_PACKAGE, "CStruct.MemberAt.Set"),
            AnnotationStub::CStruct { .. } => (INTERNAL_PACKAGE, "CStruct"),
            AnnotationStub::ObjCMethod { .. } => (RUNTIME_PACKAGE, "ObjCMethod"),
            AnnotationStub::ExternalObjCClass => (RUNTIME_PACKAGE, "ExternalObjCClass"),
            AnnotationStub::Deprecated { .. } => (BUILTINS_PACKAGE, "Deprecated"),
        };
        Classifier::new(package, name)
    }

    /// Named arguments in declaration order.
    pub fn arguments(&self) -> Vec<(&'static str, AnnotationValue)> {
        use AnnotationValue::{Boolean, Long, String as Str};
        match self {
            AnnotationStub::CCall { id } | AnnotationStub::CallingConvention { id } => {
                vec![("id", Str(id.clone()))]
            }
            AnnotationStub::ReadBits {
                offset,
                size,
                signed,
            } => vec![
                ("offset", Long(to_long(*offset))),
                ("size", AnnotationValue::Int(to_int(*size))),
                ("signed", Boolean(*signed)),
            ],
            AnnotationStub::WriteBits { offset, size } => vec![
                ("offset", Long(to_long(*offset))),
                ("size", AnnotationValue::Int(to_int(*size))),
            ],
            AnnotationStub::GetMemberAt { offset, by_value } => vec![
                ("offset", Long(to_long(*offset))),
                ("isPassedByValue", Boolean(*by_value)),
            ],
            AnnotationStub::SetMemberAt { offset } => vec![("offset", Long(to_long(*offset)))],
            AnnotationStub::CStruct { spelling } => vec![("spelling", Str(spelling.clone()))],
            AnnotationStub::ObjCMethod {
                selector,
                encoding,
                is_variadic,
            } => vec![
                ("selector", Str(selector.clone())),
                ("encoding", Str(encoding.clone())),
                ("isVariadic", Boolean(*is_variadic)),
            ],
            AnnotationStub::Deprecated { message } => vec![("message", Str(message.clone()))],
            AnnotationStub::CString
            | AnnotationStub::WCString
            | AnnotationStub::CValue
            | AnnotationStub::ReturnsRetained
            | AnnotationStub::ConsumesReceiver
            | AnnotationStub::Consumed
            | AnnotationStub::ExternalObjCClass => Vec::new(),
        }
    }
}

#[inline]
fn to_long(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[inline]
fn to_int(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ccall_carries_glue_id() {
        let a = AnnotationStub::CCall {
            id: "knibridge_add".into(),
        };
        assert_eq!(a.classifier().fq_name(), "cinterop.internal.CCall");
        assert_eq!(
            a.arguments(),
            vec![("id", AnnotationValue::String("knibridge_add".into()))]
        );
    }

    #[test]
    fn bit_field_arguments_keep_widths() {
        let a = AnnotationStub::ReadBits {
            offset: 3,
            size: 5,
            signed: true,
        };
        assert_eq!(
            a.arguments(),
            vec![
                ("offset", AnnotationValue::Long(3)),
                ("size", AnnotationValue::Int(5)),
                ("signed", AnnotationValue::Boolean(true)),
            ]
        );
    }

    #[test]
    fn marker_annotations_have_no_arguments() {
        assert!(AnnotationStub::CString.arguments().is_empty());
        assert_eq!(
            AnnotationStub::Consumed.classifier().relative_name(),
            "CCall.Consumed"
        );
    }
}
