//! Cinterop Link - cross-module forward-declaration resolution.
//!
//! Interop libraries refer to C structs and Objective-C classes they only
//! saw forward-declared through placeholder classes in reserved packages
//! (`cnames.structs`, `objcnames.classes`, `objcnames.protocols`). At link
//! time every placeholder is redirected to the real class when some loaded
//! library defines one with the same simple name.
//!
//! ```text
//! Library ─┐
//! Library ─┼─▶ LinkSession ──resolve_class / resolve_type──▶ remap table
//! Source  ─┘        │
//!                   └──finish──▶ LinkedProgram
//!                                  ├── modules (references remapped)
//!                                  └── forward declarations pseudo-file
//! ```

mod cache;
mod error;
mod forward;
mod module;
mod session;
mod walk;

pub use cache::{Declaration, DeclarationCache};
pub use error::LinkError;
pub use forward::{
    is_placeholder_name, placeholder_kind, simple_name, split_serialized,
    ForwardDeclarationFile, ForwardDeclarations, ForwardState, FORWARD_DECLARATIONS_FILE,
};
pub use module::{DeclIndex, LoadedModule, ModuleId, ModuleKind};
pub use session::{LinkSession, LinkedModule, LinkedProgram};
