//! Global initialiser checks: the global's pointer-to-storage type must
//! equal the pointer type implied by its initialiser.

use ssa_common::Type;

use crate::ir::{Initialiser, Module};
use crate::validate::ValidationError;

pub(super) fn check_globals(module: &Module) -> Result<(), ValidationError> {
    for &global in module.globals() {
        let implied = match module.global(global).init {
            Initialiser::Literal(value) => {
                if module.as_literal(value).is_none() {
                    return Err(ValidationError::global(
                        module,
                        global,
                        "Literal initialiser does not hold a literal",
                    ));
                }
                Type::Pointer(Box::new(module.value_type(value)))
            }
            Initialiser::Global(other) => Type::Pointer(Box::new(module.value_type(other))),
            Initialiser::Zero => continue,
        };
        let actual = module.value_type(global);
        if actual != implied {
            return Err(ValidationError::global(
                module,
                global,
                format!("Mismatched types: `{}` and `{}`", actual, implied),
            ));
        }
    }
    Ok(())
}
