//! Language-visibility flags carried by every stub.

use bitflags::bitflags;

bitflags! {
    /// Visibility and storage flags of a Stub IR declaration.
    ///
    /// `EXTERNAL` marks a declaration whose body lives in native code; every
    /// external function and accessor gets a C glue function.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct StubFlags: u8 {
        const PUBLIC = 1 << 0;
        const EXTERNAL = 1 << 1;
        const FINAL = 1 << 2;
        const CONST = 1 << 3;
        const LATEINIT = 1 << 4;
        const VARARG = 1 << 5;
    }
}

impl StubFlags {
    /// Flags of a public, natively backed declaration.
    pub const PUBLIC_EXTERNAL: Self = Self::PUBLIC.union(Self::EXTERNAL);

    #[inline]
    pub fn is_external(self) -> bool {
        self.contains(Self::EXTERNAL)
    }
}
