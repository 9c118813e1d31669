//! Mangled identity of an exported declaration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity used to correlate one declaration across containers.
///
/// The numeric index is the 64-bit hash of the declaration's mangled name.
/// Its top bit flags public linkage. Two declarations are the same to the
/// linker exactly when their full indices are equal; the visibility bit is
/// informational and never disambiguates, since every exported interop
/// declaration carries it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct UniqId {
    index: u64,
}

impl UniqId {
    /// Top bit of the index, set for public declarations.
    pub const PUBLIC_MASK: u64 = 1 << 63;

    #[inline]
    pub const fn new(index: u64) -> Self {
        UniqId { index }
    }

    /// Identity of a public declaration with the given content hash.
    #[inline]
    pub const fn public(hash: u64) -> Self {
        UniqId {
            index: hash | Self::PUBLIC_MASK,
        }
    }

    #[inline]
    pub const fn index(self) -> u64 {
        self.index
    }

    #[inline]
    pub const fn is_public(self) -> bool {
        self.index & Self::PUBLIC_MASK != 0
    }
}

impl fmt::Debug for UniqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqId({:016x})", self.index)
    }
}

impl fmt::Display for UniqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.index)
    }
}
