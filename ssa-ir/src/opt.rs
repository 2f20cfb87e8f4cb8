//! Pass pipeline
//!
//! A [`PassList`] validates the module, then runs each pass in order and
//! re-validates after every one, so a broken module is attributed to the
//! pass that produced it.

use std::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::ir::Module;
use crate::validate::{validate, ValidationError};

/// A module transformation
pub trait Pass {
    fn name(&self) -> &str;
    fn run(&self, module: &mut Module);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("Module is invalid before running passes: {0}")]
    InvalidInput(ValidationError),

    #[error("Pass `{pass}` caused validation error: {error}")]
    InvalidOutput { pass: String, error: ValidationError },
}

#[derive(Default)]
pub struct PassList {
    passes: Vec<Box<dyn Pass>>,
}

impl PassList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pass: impl Pass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn run(&self, module: &mut Module) -> Result<(), PassError> {
        validate(module).map_err(PassError::InvalidInput)?;
        info!("opt: running {} on module '{}'", self, module.module_name());
        for pass in &self.passes {
            debug!("opt: pass `{}`", pass.name());
            pass.run(module);
            validate(module).map_err(|error| PassError::InvalidOutput {
                pass: pass.name().to_string(),
                error,
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for PassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.passes.iter().map(|p| p.name()).collect();
        write!(f, "PassList: {{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::InstKind;
    use crate::test_helpers::{fib_module, max2_module};
    use pretty_assertions::assert_eq;

    struct Nothing;

    impl Pass for Nothing {
        fn name(&self) -> &str {
            "nothing"
        }

        fn run(&self, _module: &mut Module) {}
    }

    /// Deletes every block terminator
    struct DropTerminators;

    impl Pass for DropTerminators {
        fn name(&self) -> &str {
            "drop terminators"
        }

        fn run(&self, module: &mut Module) {
            let functions = module.functions().to_vec();
            for func in functions {
                for block in module.function(func).blocks().to_vec() {
                    if let Some(last) = module.block(block).last_instr() {
                        if module.instruction(last).is_terminator() {
                            module.remove_instruction(last, None).unwrap();
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_display_lists_pass_names() {
        let mut passes = PassList::new();
        assert_eq!(passes.to_string(), "PassList: {}");
        passes.add(Nothing).add(DropTerminators);
        assert_eq!(passes.len(), 2);
        assert_eq!(passes.to_string(), "PassList: {nothing, drop terminators}");
    }

    #[test]
    fn test_noop_passes_keep_module_valid() {
        let mut module = fib_module();
        let mut passes = PassList::new();
        passes.add(Nothing).add(Nothing);
        assert_eq!(passes.run(&mut module), Ok(()));
    }

    #[test]
    fn test_breaking_pass_is_named() {
        let mut module = max2_module();
        let mut passes = PassList::new();
        passes.add(Nothing).add(DropTerminators);
        match passes.run(&mut module) {
            Err(PassError::InvalidOutput { pass, .. }) => assert_eq!(pass, "drop terminators"),
            other => panic!("expected pass failure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_input_is_rejected_before_passes() {
        let mut module = max2_module();
        let func = module.functions()[0];
        let last = module.function(func).blocks()[1];
        let ret = module.block(last).last_instr().unwrap();
        assert!(matches!(module.instruction(ret).kind(), InstKind::Ret));
        module.remove_instruction(ret, None).unwrap();

        let passes = PassList::new();
        assert!(matches!(passes.run(&mut module), Err(PassError::InvalidInput(_))));
    }
}
