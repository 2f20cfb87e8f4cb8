use std::collections::HashSet;

use crate::ir::{Module, Printer};
use crate::validate::ValidationError;

pub(super) fn check_function_names(module: &Module) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for &func in module.functions() {
        let name = module.name(func.value());
        if name.is_empty() {
            return Err(ValidationError::function(module, func, "Empty function name"));
        }
        if !seen.insert(name) {
            return Err(ValidationError::function(
                module,
                func,
                format!("Duplicate function name `{}`", name),
            ));
        }
    }
    Ok(())
}

/// Global names may be empty or repeat since display names number them,
/// but a resolved global name must not be taken by a function.
pub(super) fn check_global_names(module: &Module) -> Result<(), ValidationError> {
    let functions: HashSet<&str> = module.functions().iter().map(|&f| module.name(f.value())).collect();
    let printer = Printer::new(module);
    for &global in module.globals() {
        let name = printer.name(global);
        if functions.contains(name.as_str()) {
            return Err(ValidationError::global(
                module,
                global,
                format!("Global name `{}` is also a function name", name),
            ));
        }
    }
    Ok(())
}
