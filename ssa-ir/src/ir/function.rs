//! Function Definitions

use ssa_common::Signature;

use crate::ir::values::{BlockId, ValueId};

/// A function: signature, one parameter value per signature parameter
/// and an ordered list of blocks. A function without blocks is a
/// prototype (external declaration).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub(crate) sig: Signature,
    pub(crate) params: Vec<ValueId>,
    pub(crate) blocks: Vec<BlockId>,
}

impl Function {
    pub fn signature(&self) -> &Signature {
        &self.sig
    }

    pub fn params(&self) -> &[ValueId] {
        &self.params
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }

    pub fn is_prototype(&self) -> bool {
        self.blocks.is_empty()
    }
}
