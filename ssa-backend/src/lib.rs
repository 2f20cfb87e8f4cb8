//! SSA back end - amd64 Code Generator
//!
//! Lowers a validated [`Module`] to GNU assembler source for x86-64 on
//! Linux, macOS or Windows.
//!
//! ```no_run
//! use ssa_backend::{generate, CodegenOptions};
//! # let module = ssa_ir::test_helpers::max2_module();
//! let mut out = Vec::new();
//! generate(&mut out, &module, &CodegenOptions::default())?;
//! # Ok::<(), ssa_backend::CodegenError>(())
//! ```

pub mod error;
pub mod frame;
pub mod globals;
pub mod lower;
pub mod naming;

#[cfg(test)]
mod tests;

use std::io::Write;

use log::info;
use serde::{Deserialize, Serialize};
use ssa_codegen::{emit_instructions, Platform};
use ssa_ir::{validate, Module};

pub use error::CodegenError;

/// Code generation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    pub platform: Platform,
    /// Echo each IR line as an assembly comment
    pub ir_comments: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            platform: Platform::Linux,
            ir_comments: true,
        }
    }
}

/// Validate `module` and write its assembly to `out`. Nothing is written
/// unless the whole module lowers successfully.
pub fn generate<W: Write + ?Sized>(out: &mut W, module: &Module, options: &CodegenOptions) -> Result<(), CodegenError> {
    validate(module)?;
    let instructions = lower::lower_module(module, options)?;
    emit_instructions(out, &instructions)?;
    info!("codegen: wrote {} lines for module '{}'", instructions.len(), module.module_name());
    Ok(())
}
