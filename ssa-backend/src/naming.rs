//! Symbol and label naming
//!
//! Functions and globals are referred to by their resolved IR names,
//! decorated for the target platform. Globals whose names are not valid
//! assembler identifiers (the numbered names of unnamed globals) become
//! assembler-local labels. Block and edge labels come from a single
//! module-wide counter so they never collide across functions.

use std::collections::{HashMap, HashSet};

use ssa_codegen::Platform;
use ssa_ir::ir::{Printer, ValueId};
use ssa_ir::Module;

use crate::error::CodegenError;

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$')
}

#[derive(Debug)]
pub struct Symbols {
    names: HashMap<ValueId, String>,
    local: HashSet<ValueId>,
    label_prefix: &'static str,
    next_label: u32,
}

impl Symbols {
    pub fn build(module: &Module, printer: &Printer<'_>, platform: Platform) -> Result<Self, CodegenError> {
        let prefix = platform.symbol_prefix();
        let label_prefix = platform.local_label_prefix();
        let mut names = HashMap::new();
        let mut local = HashSet::new();
        let mut taken: HashMap<String, ValueId> = HashMap::new();

        let mut claim = |id: ValueId, symbol: String| -> Result<(), CodegenError> {
            if let Some(&other) = taken.get(&symbol) {
                return Err(CodegenError::unsupported(
                    format!("duplicate symbol `{}`", symbol),
                    format!("`@{}` and `@{}` map to the same symbol", printer.name(other), printer.name(id)),
                ));
            }
            taken.insert(symbol.clone(), id);
            names.insert(id, symbol);
            Ok(())
        };

        for &func in module.functions() {
            let name = printer.name(func);
            if !is_identifier(&name) {
                return Err(CodegenError::unsupported(
                    format!("function name `{}`", name),
                    printer.function_trace(func),
                ));
            }
            claim(func.value(), format!("{}{}", prefix, name))?;
        }
        for (index, &global) in module.globals().iter().enumerate() {
            let name = printer.name(global);
            if is_identifier(&name) {
                claim(global.value(), format!("{}{}", prefix, name))?;
            } else {
                claim(global.value(), format!("{}global{}", label_prefix, index))?;
                local.insert(global.value());
            }
        }

        Ok(Self { names, local, label_prefix, next_label: 0 })
    }

    /// Symbol of a function or global
    pub fn symbol(&self, id: impl Into<ValueId>) -> &str {
        let id = id.into();
        self.names.get(&id).map(String::as_str).unwrap_or_default()
    }

    /// Whether the symbol is private to the assembly file
    pub fn is_local(&self, id: impl Into<ValueId>) -> bool {
        self.local.contains(&id.into())
    }

    /// A new assembler-local label
    pub fn fresh_label(&mut self) -> String {
        let label = format!("{}{}", self.label_prefix, self.next_label);
        self.next_label += 1;
        label
    }
}
