//! Code generation errors

use ssa_codegen::{AbiError, LayoutError};
use ssa_ir::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Cannot generate code for an invalid module: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error("Unsupported {construct}\n -> {context}")]
    Unsupported { construct: String, context: String },

    #[error("Failed to write assembly: {0}")]
    Io(#[from] std::io::Error),
}

impl CodegenError {
    pub(crate) fn unsupported(construct: impl Into<String>, context: impl Into<String>) -> Self {
        CodegenError::Unsupported { construct: construct.into(), context: context.into() }
    }
}
