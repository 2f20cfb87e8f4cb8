//! Unique display names
//!
//! Names are resolved per scope: globals share one module-wide scope,
//! while parameters, blocks and instruction values share one scope per
//! function. Empty names become numbers starting at 1 and repeated names
//! get a numeric suffix. Function names are used as-is.

use std::collections::{HashMap, HashSet};

use crate::ir::module::Module;
use crate::ir::values::ValueId;

#[derive(Debug, Default)]
struct Scope {
    counts: HashMap<String, usize>,
    used: HashSet<String>,
}

impl Scope {
    fn claim(&mut self, name: &str) -> String {
        let count = self
            .counts
            .entry(name.to_string())
            .or_insert(if name.is_empty() { 1 } else { 0 });
        let mut candidate = if *count == 0 {
            name.to_string()
        } else {
            format!("{}{}", name, count)
        };
        while self.used.contains(&candidate) {
            *count += 1;
            candidate = format!("{}{}", name, count);
        }
        *count += 1;
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Resolved display names for every named value of a module
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: HashMap<ValueId, String>,
}

impl NameTable {
    pub fn build(module: &Module) -> Self {
        let mut names = HashMap::new();

        let mut globals = Scope::default();
        for &global in module.globals() {
            names.insert(global.value(), globals.claim(module.name(global.value())));
        }

        for &func in module.functions() {
            names.insert(func.value(), module.name(func.value()).to_string());

            let mut scope = Scope::default();
            let function = module.function(func);
            for &param in function.params() {
                names.insert(param, scope.claim(module.name(param)));
            }
            for &block in function.blocks() {
                names.insert(block.value(), scope.claim(module.name(block.value())));
            }
            for &block in function.blocks() {
                for &inst in module.block(block).instrs() {
                    if module.produces_value(inst) {
                        names.insert(inst.value(), scope.claim(module.name(inst.value())));
                    }
                }
            }
        }

        Self { names }
    }

    pub fn get(&self, id: ValueId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub(crate) fn into_entries(self) -> Vec<(ValueId, String)> {
        self.names.into_iter().collect()
    }
}
