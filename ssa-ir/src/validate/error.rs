//! Validation errors
//!
//! Each variant names the offending entity by handle and carries a trace
//! rendered when the error was produced, so the message stays readable
//! even if the module changes afterwards.

use thiserror::Error;

use crate::ir::{BlockId, FuncId, GlobalId, InstId, Module, Printer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("FunctionError: {message}\n -> {trace}")]
    Function { function: FuncId, trace: String, message: String },

    #[error("BlockError: {message}\n -> {trace}")]
    Block { block: BlockId, trace: String, message: String },

    #[error("InstrError: {message}\n -> {trace}")]
    Instruction { instruction: InstId, trace: String, message: String },

    #[error("GlobalError: {message}\n -> {trace}")]
    Global { global: GlobalId, trace: String, message: String },
}

impl ValidationError {
    pub(crate) fn function(module: &Module, function: FuncId, message: impl Into<String>) -> Self {
        ValidationError::Function {
            function,
            trace: Printer::new(module).function_trace(function),
            message: message.into(),
        }
    }

    pub(crate) fn block(module: &Module, block: BlockId, message: impl Into<String>) -> Self {
        ValidationError::Block {
            block,
            trace: Printer::new(module).block_trace(block),
            message: message.into(),
        }
    }

    pub(crate) fn instruction(module: &Module, instruction: InstId, message: impl Into<String>) -> Self {
        ValidationError::Instruction {
            instruction,
            trace: Printer::new(module).instruction_trace(instruction),
            message: message.into(),
        }
    }

    pub(crate) fn global(module: &Module, global: GlobalId, message: impl Into<String>) -> Self {
        ValidationError::Global {
            global,
            trace: Printer::new(module).global_trace(global),
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ValidationError::Function { message, .. }
            | ValidationError::Block { message, .. }
            | ValidationError::Instruction { message, .. }
            | ValidationError::Global { message, .. } => message,
        }
    }
}
