//! Link session errors.

use cinterop_klib::KlibError;

use crate::module::ModuleId;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error(transparent)]
    Library(#[from] KlibError),

    #[error("no module {0} in this link session")]
    UnknownModule(ModuleId),

    #[error("module `{module}` has no serialized declarations")]
    NoSerializedForm { module: String },
}
