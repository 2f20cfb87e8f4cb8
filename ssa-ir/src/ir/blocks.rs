//! Basic Block Management
//!
//! A block is an owning sequence of instructions inside one function.
//! Predecessors are not stored: they are the branch instructions found
//! in the block's reference list.

use crate::ir::values::{FuncId, InstId};

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub(crate) function: FuncId,
    pub(crate) instrs: Vec<InstId>,
}

impl Block {
    pub(crate) fn new(function: FuncId) -> Self {
        Self { function, instrs: Vec::new() }
    }

    pub fn function(&self) -> FuncId {
        self.function
    }

    pub fn instrs(&self) -> &[InstId] {
        &self.instrs
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn num_instrs(&self) -> usize {
        self.instrs.len()
    }

    pub fn first_instr(&self) -> Option<InstId> {
        self.instrs.first().copied()
    }

    pub fn last_instr(&self) -> Option<InstId> {
        self.instrs.last().copied()
    }

    pub fn instr_index(&self, needle: InstId) -> Option<usize> {
        self.instrs.iter().position(|&i| i == needle)
    }
}
