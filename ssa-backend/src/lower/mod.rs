//! IR to amd64 lowering
//!
//! Every value lives in its home stack slot. Each instruction loads its
//! operands into scratch registers (`%rax`, `%rcx`, `%rdx`, `%r11`),
//! computes, and writes the result back, so no register state survives
//! from one instruction to the next.
//!
//! ## Structure
//! - `function` - Per-function state, prologue, epilogue, parameters
//! - `operand` - Moving values between slots, registers and memory
//! - `instruction` - Arithmetic, comparisons, conversions, memory, GEP
//! - `call` - Call sites
//! - `phi` - Branches and phi resolution

use log::{debug, info};
use ssa_codegen::{AsmInst, DataLayout};
use ssa_ir::ir::Printer;
use ssa_ir::Module;

use crate::error::CodegenError;
use crate::globals::lower_globals;
use crate::naming::Symbols;
use crate::CodegenOptions;

use self::function::FunctionLowering;

mod call;
mod function;
mod instruction;
mod operand;
mod phi;

/// Lower a validated module to a complete instruction list
pub fn lower_module(module: &Module, options: &CodegenOptions) -> Result<Vec<AsmInst>, CodegenError> {
    info!("codegen: lowering module '{}' for {:?}", module.module_name(), options.platform);
    let printer = Printer::new(module);
    let layout = DataLayout::new();
    let mut symbols = Symbols::build(module, &printer, options.platform)?;

    let mut instructions = lower_globals(module, &printer, &symbols, &layout, options)?;

    instructions.push(AsmInst::Section(".text".to_string()));
    for &func in module.functions() {
        if module.function(func).is_prototype() {
            debug!("codegen: skipping prototype '{}'", printer.name(func));
            continue;
        }
        let lowering = FunctionLowering::new(module, &printer, &layout, options, &mut symbols, func)?;
        instructions.extend(lowering.lower()?);
    }

    if options.platform.is_elf() {
        instructions.push(AsmInst::Section(".section .note.GNU-stack,\"\",@progbits".to_string()));
    }

    info!("codegen: module lowering complete, generated {} instructions", instructions.len());
    Ok(instructions)
}
