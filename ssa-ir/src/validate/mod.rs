//! Module validator
//!
//! A fixed, ordered pipeline of independent checks. The first failing
//! check stops the pipeline and its error is returned. Later checks may
//! rely on earlier ones: dominance analysis runs only once every block is
//! known to be non-empty and properly terminated.

use log::{info, trace};

use crate::ir::Module;

pub use self::error::ValidationError;

mod blocks;
mod error;
mod functions;
mod globals;
mod instr;
mod phi;


type Check = fn(&Module) -> Result<(), ValidationError>;

const CHECKS: &[(&str, Check)] = &[
    ("empty block", blocks::check_empty_blocks),
    ("illegal terminator", blocks::check_illegal_terminators),
    ("block does not terminate", blocks::check_block_terminates),
    ("branch to entry", blocks::check_branch_to_entry),
    ("entry phi", blocks::check_entry_phi),
    ("instructions", instr::check_instructions),
    ("function names", functions::check_function_names),
    ("global names", functions::check_global_names),
    ("globals", globals::check_globals),
];

/// Validate a fully constructed module
pub fn validate(module: &Module) -> Result<(), ValidationError> {
    info!("validate: module '{}'", module.module_name());
    for (name, check) in CHECKS {
        trace!("validate: running '{}' check", name);
        check(module)?;
    }
    Ok(())
}
