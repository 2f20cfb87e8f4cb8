//! IR mutation errors

use thiserror::Error;

use crate::ir::values::ValueId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("cannot remove instruction {inst}: it still has {uses} use(s) and no replacement was given")]
    InstructionInUse { inst: ValueId, uses: usize },

    #[error("instruction {0} is not attached to a block")]
    Detached(ValueId),
}
