//! Block shape checks: non-empty, single trailing terminator, nothing
//! branches to or merges into the entry block.

use crate::ir::{BlockId, InstKind, Module};
use crate::validate::ValidationError;

/// Every block of every defined function, in order
fn blocks(module: &Module) -> impl Iterator<Item = BlockId> + '_ {
    module
        .functions()
        .iter()
        .flat_map(move |&f| module.function(f).blocks().iter().copied())
}

pub(super) fn check_empty_blocks(module: &Module) -> Result<(), ValidationError> {
    for block in blocks(module) {
        if module.block(block).is_empty() {
            return Err(ValidationError::block(module, block, "Empty block"));
        }
    }
    Ok(())
}

pub(super) fn check_illegal_terminators(module: &Module) -> Result<(), ValidationError> {
    for block in blocks(module) {
        let instrs = module.block(block).instrs();
        let body = &instrs[..instrs.len().saturating_sub(1)];
        if let Some(&inst) = body.iter().find(|&&i| module.instruction(i).is_terminator()) {
            return Err(ValidationError::instruction(
                module,
                inst,
                "Terminating instruction in middle of block",
            ));
        }
    }
    Ok(())
}

pub(super) fn check_block_terminates(module: &Module) -> Result<(), ValidationError> {
    for block in blocks(module) {
        let terminated = module
            .block(block)
            .last_instr()
            .is_some_and(|i| module.instruction(i).is_terminator());
        if !terminated {
            return Err(ValidationError::block(module, block, "Non-terminating block"));
        }
    }
    Ok(())
}

pub(super) fn check_branch_to_entry(module: &Module) -> Result<(), ValidationError> {
    for &func in module.functions() {
        let Some(entry) = module.function(func).entry_block() else {
            continue;
        };
        for &user in module.references(entry) {
            if matches!(module.instruction(user).kind(), InstKind::Br | InstKind::CondBr) {
                return Err(ValidationError::instruction(module, user, "Branch to entry block"));
            }
        }
    }
    Ok(())
}

pub(super) fn check_entry_phi(module: &Module) -> Result<(), ValidationError> {
    for &func in module.functions() {
        let Some(entry) = module.function(func).entry_block() else {
            continue;
        };
        for &inst in module.block(entry).instrs() {
            if module.instruction(inst).is_phi() {
                return Err(ValidationError::instruction(module, inst, "Phi node in entry block"));
            }
        }
    }
    Ok(())
}
